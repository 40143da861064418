// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::fs;
use tempfile::TempDir;

use wikiserver::{request::HttpRequest, router::Router};

/// `notes/` 下放 `siblings` 组 `noteN.md` + `noteN.txt`
fn wiki_tree(siblings: usize) -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let wiki = dir.path().join("wiki");
    let notes = wiki.join("notes");
    let resources = dir.path().join("resources");
    fs::create_dir_all(&notes).unwrap();
    fs::create_dir_all(resources.join("css")).unwrap();
    fs::write(resources.join("css").join("style.css"), "body {}").unwrap();
    fs::write(wiki.join("article.md"), "# Article").unwrap();
    for i in 0..siblings {
        fs::write(notes.join(format!("note{}.md", i)), "text").unwrap();
        fs::write(notes.join(format!("note{}.txt", i)), "text").unwrap();
    }
    let router = Router::new(&wiki, &resources);
    (dir, router)
}

fn request_line(target: &str) -> Vec<u8> {
    format!("GET {} HTTP/1.1\r\nHost: localhost\r\nAccept-Encoding: gzip\r\n\r\n", target)
        .into_bytes()
}

fn target_decoding_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("target_decoding");

    let long_ascii = format!("/wiki/{}", vec!["segment"; 120].join("/"));
    let cyrillic = format!("/wiki/{}", "%D0%9F%D1%80%D0%B8%D0%BC%D0%B5%D1%80/".repeat(40));
    let chinese = format!("/search/{}", "%E4%B8%AD%E6%96%87%20".repeat(60));
    let absolute = "http://wiki.local:7878/wiki/guide/install?draft=1#step-2".to_string();

    for (name, target) in [
        ("long_ascii", long_ascii),
        ("cyrillic", cyrillic),
        ("chinese_query", chinese),
        ("absolute_form", absolute),
    ] {
        let buffer = request_line(&target);
        group.bench_with_input(BenchmarkId::from_parameter(name), &buffer, |b, buffer| {
            b.iter(|| {
                let request = HttpRequest::try_from(black_box(buffer), 0).unwrap();
                black_box(request.path().len());
            });
        });
    }

    let rejected = request_line("ftp://wiki.local/wiki/article");
    group.bench_function("foreign_scheme_rejected", |b| {
        b.iter(|| {
            let _ = HttpRequest::try_from(black_box(&rejected), 0);
        });
    });

    group.finish();
}

fn route_prefix_benchmark(c: &mut Criterion) {
    let (_dir, router) = wiki_tree(10);

    let mut group = c.benchmark_group("route_prefix");
    for (name, path) in [
        ("resource", "/resources/css/style.css"),
        ("resource_missing", "/resources/css/absent.css"),
        ("search", "/search/install guide/"),
        ("section", "/wiki/notes"),
        ("page_exact", "/wiki/article.md"),
        ("hidden_as_search", "/wiki/.query"),
        ("redirect", "/Статья про wiki"),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let _ = router.route(black_box(path)).unwrap();
            });
        });
    }
    group.finish();
}

fn candidate_glob_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("candidate_glob");
    group.sample_size(20);

    for siblings in [10, 100, 1000].iter() {
        let (_dir, router) = wiki_tree(*siblings);
        let hit = format!("/wiki/notes/note{}", siblings / 2);

        group.bench_with_input(BenchmarkId::new("extensionless", siblings), &hit, |b, hit| {
            b.iter(|| {
                let _ = router.route(black_box(hit)).unwrap();
            });
        });
        group.bench_with_input(
            BenchmarkId::new("fallback_search", siblings),
            &"/wiki/notes/absent",
            |b, miss| {
                b.iter(|| {
                    let _ = router.route(black_box(miss)).unwrap();
                });
            },
        );
    }
    group.finish();
}

fn parse_then_route_benchmark(c: &mut Criterion) {
    let (_dir, router) = wiki_tree(100);
    let buffers: Vec<Vec<u8>> = [
        "/",
        "/wiki/notes/note42",
        "/search/note",
        "/resources/css/style.css",
        "/wiki/notes/%6Eote7.md",
    ]
    .iter()
    .map(|target| request_line(target))
    .collect();

    c.bench_function("parse_then_route", |b| {
        b.iter(|| {
            for buffer in &buffers {
                let request = HttpRequest::try_from(black_box(buffer), 0).unwrap();
                let routed = router.route(request.path()).unwrap();
                black_box(routed.map(|routed| routed.kind()));
            }
        });
    });
}

criterion_group!(
    benches,
    target_decoding_benchmark,
    route_prefix_benchmark,
    candidate_glob_benchmark,
    parse_then_route_benchmark
);
criterion_main!(benches);
