use flate2::write::GzEncoder;
use flate2::Compression;
use pmsi_stays::pack::save_pack;
use pmsi_stays::{write_json, StayFlag, StaySetBuilder, StayTests};
use pmsi_test_utils::{FichCompLine, RsaLine, RsaUnit, RssLine};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::path::{Path, PathBuf};

fn write_lines(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

fn grp_lines() -> Vec<String> {
    vec![
        RssLine::new(19)
            .bill_id(20)
            .admin_id(2)
            .entry("05012021", '8', ' ')
            .exit("07012021", '8', ' ')
            .main_diagnosis("J189")
            .grouped("04M05T", 0)
            .build(),
        RssLine::new(19)
            .bill_id(10)
            .admin_id(1)
            .entry("01012021", '8', ' ')
            .exit("02012021", '6', '1')
            .grouped("05C02Z", 0)
            .build(),
        RssLine::new(19)
            .bill_id(10)
            .admin_id(1)
            .entry("02012021", '6', '1')
            .exit("04012021", '8', ' ')
            .grouped("05C02Z", 0)
            .build(),
    ]
}

#[test]
fn grp_file_with_tests() {
    let dir = tempfile::tempdir().unwrap();
    let grp = write_lines(dir.path(), "stays.grp", &grp_lines());

    let mut builder = StaySetBuilder::new();
    let mut tests = StayTests::new();
    let summary = builder.load_files(&[&grp], Some(&mut tests));

    assert!(summary.is_success());
    assert_eq!(summary.stays, 3);
    let set = builder.finish();

    let bills: Vec<i32> = set.stays.iter().map(|s| s.bill_id).collect();
    assert_eq!(bills, vec![10, 10, 20]);
    assert_eq!(set.clusters().count(), 2);

    assert_eq!(tests.len(), 2);
    assert_eq!(tests[&10].cluster_len, 2);
    assert_eq!(tests[&20].ghm.unwrap().to_string(), "04M05T");
}

#[test]
fn gzip_rsa_and_unknown_extension() {
    let dir = tempfile::tempdir().unwrap();
    let rsa = RsaLine::new(223)
        .bill_id(77)
        .ghm("08C48Z", 0)
        .age(40, 0)
        .exit(2, 2021, '8', ' ')
        .duration(2)
        .unit(RsaUnit::new(2, 'C').main_diagnosis("S7200"))
        .build();

    let gz_path = dir.path().join("2021.rsa.gz");
    let mut encoder = GzEncoder::new(std::fs::File::create(&gz_path).unwrap(), Compression::default());
    encoder.write_all(rsa.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let csv = write_lines(dir.path(), "stays.csv", &["x".to_string()]);
    let missing = dir.path().join("missing.rss");

    let mut builder = StaySetBuilder::new();
    let mut tests = StayTests::new();
    let summary = builder.load_files(&[gz_path.clone(), csv.clone(), missing.clone()], Some(&mut tests));

    assert_eq!(summary.files_loaded, 1);
    assert_eq!(summary.failed, vec![csv, missing]);
    assert!(!summary.is_success());

    let set = builder.finish();
    assert_eq!(set.len(), 1);
    assert_eq!(set.stays[0].bill_id, 77);
    assert_eq!(tests[&77].cluster_len, 1);
}

#[test]
fn fichcomp_is_applied_on_finish() {
    let dir = tempfile::tempdir().unwrap();
    let grp = write_lines(dir.path(), "stays.grp", &grp_lines());
    let fichcomp = write_lines(
        dir.path(),
        "fichcomp.txt",
        &[
            FichCompLine::ucd(10, 2, "06012021").build(),
            FichCompLine::other(99).build(),
            FichCompLine::dip(1, "01012021", "04012021", 2).build(),
        ],
    );

    let mut builder = StaySetBuilder::new();
    let summary = builder.load_files(&[grp, fichcomp], None);
    assert!(summary.is_success());

    let set = builder.finish();
    assert_eq!(set.stays[0].dip_count, 2);
    assert!(set.stays[2].flags.contains(StayFlag::Ucd));
    assert!(!set.stays[0].flags.contains(StayFlag::Ucd));
}

#[test]
fn pack_and_json_reload() {
    let dir = tempfile::tempdir().unwrap();
    let grp = write_lines(dir.path(), "stays.grp", &grp_lines());

    let mut builder = StaySetBuilder::new();
    let mut tests = StayTests::new();
    builder.load_files(&[grp], Some(&mut tests));
    let set = builder.finish();

    let pack = dir.path().join("stays.dmpak.gz");
    save_pack(&pack, &set.stays).unwrap();

    let json = dir.path().join("stays.json");
    let mut file = std::fs::File::create(&json).unwrap();
    write_json(&mut file, &set.stays, Some(&tests), false).unwrap();
    drop(file);

    let mut from_pack = StaySetBuilder::new();
    let mut pack_tests = StayTests::new();
    assert!(from_pack.load_files(&[&pack], Some(&mut pack_tests)).is_success());
    assert_eq!(from_pack.finish(), set);
    assert!(pack_tests.is_empty());

    let mut from_json = StaySetBuilder::new();
    let mut json_tests = StayTests::new();
    assert!(from_json.load_files(&[&json], Some(&mut json_tests)).is_success());
    assert_eq!(from_json.finish(), set);
    assert_eq!(json_tests, tests);
}

#[test]
fn corrupt_pack_fails_only_that_file() {
    let dir = tempfile::tempdir().unwrap();
    let pack = dir.path().join("broken.dmpak");
    std::fs::write(&pack, b"MCO_STAY_PACK\x01short").unwrap();
    let grp = write_lines(dir.path(), "stays.grp", &grp_lines());

    let mut builder = StaySetBuilder::new();
    let summary = builder.load_files(&[pack.clone(), grp], None);
    assert_eq!(summary.failed, vec![pack]);
    assert_eq!(builder.finish().len(), 3);
}
