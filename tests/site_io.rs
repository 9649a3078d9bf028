//! Generated tree → disk → archive / manifest, and regeneration from
//! fragments recorded in a job store.

use pdfdeck::store::{ensure_converted, ensure_generated, resolve_page_count};
use pdfdeck::{
    archive_dir, deploy_manifest, generate, generate_from_fragments, write_tree, JobRecord,
    JobStatus, JobStore, LeadGatePolicy, Page, TemplateJob, TemplateKind,
};
use std::io::Read;

fn small_job(kind: TemplateKind) -> TemplateJob {
    let mut job = TemplateJob::new(kind, "Site");
    job.pages = vec![Page::new(1, "<p>a</p>"), Page::new(2, "<p>b</p>")];
    job
}

#[test]
fn written_site_matches_the_tree_and_archives() {
    tokio_test::block_on(async {
        let out = tempfile::tempdir().unwrap();
        let site = out.path().join("site");
        let tree = generate(&small_job(TemplateKind::Documentation));

        let report = write_tree(&tree, &site).await.unwrap();
        assert_eq!(report.files, tree.len());
        assert_eq!(report.bytes, tree.total_bytes());
        for (path, file) in tree.files() {
            assert_eq!(std::fs::read(site.join(path)).unwrap(), file.bytes, "{path}");
        }

        let manifest = deploy_manifest(&site).unwrap();
        let expected: Vec<_> = tree.paths().collect();
        let got: Vec<_> = manifest.keys().map(String::as_str).collect();
        assert_eq!(got, expected);

        let zip_path = out.path().join("site.zip");
        assert_eq!(archive_dir(&site, &zip_path).unwrap(), tree.len());

        let mut archive = zip::ZipArchive::new(std::fs::File::open(&zip_path).unwrap()).unwrap();
        let mut index = String::new();
        archive
            .by_name("index.html")
            .unwrap()
            .read_to_string(&mut index)
            .unwrap();
        assert_eq!(Some(index.as_str()), tree.index_html());
    });
}

#[tokio::test]
async fn regenerating_replaces_the_previous_site() {
    let out = tempfile::tempdir().unwrap();
    let site = out.path().join("site");

    write_tree(&generate(&small_job(TemplateKind::Presentation)), &site)
        .await
        .unwrap();
    assert!(site.join("js/slideshow.js").is_file());

    write_tree(&generate(&small_job(TemplateKind::Flipbook)), &site)
        .await
        .unwrap();
    assert!(site.join("js/flipbook.js").is_file());
    assert!(!site.join("js/slideshow.js").exists());

    let leftovers: Vec<_> = std::fs::read_dir(out.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(leftovers, vec!["site".to_string()]);
}

#[tokio::test]
async fn stored_job_regenerates_with_another_template() {
    let root = tempfile::tempdir().unwrap();
    let frags = root.path().join("frags");
    std::fs::create_dir_all(frags.join("assets")).unwrap();
    for n in 1..=3 {
        std::fs::write(frags.join(format!("page-{n}.html")), format!("<h2>P{n}</h2>")).unwrap();
    }
    std::fs::write(frags.join("page-2.txt"), "Pricing overview").unwrap();
    std::fs::write(frags.join("assets/logo.png"), [0x89, b'P', b'N', b'G']).unwrap();

    // A conversion step recorded its result.
    let store_path = root.path().join("jobs.json");
    let mut store = JobStore::open(&store_path).await.unwrap();
    let mut record = JobRecord::new("q3");
    record.status = JobStatus::Converted;
    record.fragments_dir = Some(frags.clone());
    store.upsert(record);
    store.save().await.unwrap();

    // Later, a generation request for the same job.
    let mut store = JobStore::open(&store_path).await.unwrap();
    let record = store.require("q3").unwrap().clone();
    assert!(ensure_generated(&record).is_err());
    let dir = ensure_converted(&record).unwrap().to_path_buf();

    let mut job = TemplateJob::new(TemplateKind::Documentation, "Q3");
    job.lead_gate = LeadGatePolicy::enabled(2);
    job.page_count = Some(resolve_page_count(None, Some(&record), Some(&dir)).await.unwrap());
    assert_eq!(job.page_count, Some(3));

    let tree = generate_from_fragments(&dir, &job).await.unwrap();
    assert!(tree.warnings.is_empty(), "{:?}", tree.warnings);
    assert_eq!(tree.get("assets/logo.png").unwrap().media_type, "image/png");
    let html = tree.index_html().unwrap();
    assert!(html.contains("<h2>P3</h2>"));
    assert!(html.contains("Pricing overview"));

    let site = root.path().join("site");
    write_tree(&tree, &site).await.unwrap();
    let mut record = record;
    record.status = JobStatus::Generated;
    record.output_dir = Some(site.clone());
    record.template = Some(tree.template);
    store.upsert(record);
    store.save().await.unwrap();

    let store = JobStore::open(&store_path).await.unwrap();
    let record = store.require("q3").unwrap();
    assert_eq!(ensure_generated(record).unwrap(), site.as_path());
    assert_eq!(record.template, Some(TemplateKind::Documentation));
}
