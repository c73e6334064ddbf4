use pmsi_codes::PmsiDate;
use pmsi_stays::fichcomp::parse_fichcomp_line;
use pmsi_stays::rsa::parse_rsa_line;
use pmsi_stays::rss::parse_rss_line;
use pmsi_stays::{split_clusters, Stay, StayTests};
use pmsi_test_utils::{RsaLine, RsaUnit, RssLine};
use proptest::prelude::*;

fn printable_line(max: usize) -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(prop_oneof![Just(b' '), Just(b'0'), Just(b'1'), 0x20u8..0x7f], 0..max)
}

proptest! {
    #[test]
    fn prop_rss_never_panics(mut line in printable_line(600), version in 16i16..=20, grouped in any::<bool>()) {
        if line.len() >= 12 {
            let tag = if grouped { version + 100 } else { version };
            line[9..12].copy_from_slice(format!("{tag:03}").as_bytes());
        }
        let mut out = Vec::new();
        let mut tests = StayTests::new();
        let _ = parse_rss_line(&line, &mut out, Some(&mut tests));
        prop_assert!(out.len() <= 1);
    }

    #[test]
    fn prop_rsa_never_panics(mut line in printable_line(900), version in 220i16..=225) {
        if line.len() >= 12 {
            line[9..12].copy_from_slice(format!("{version:03}").as_bytes());
        }
        let mut out = Vec::new();
        let _ = parse_rsa_line(&line, &mut out, None);
    }

    #[test]
    fn prop_fichcomp_never_panics(line in printable_line(200)) {
        let _ = parse_fichcomp_line(&line);
    }

    #[test]
    fn prop_rsa_unit_count_matches(durations in proptest::collection::vec(0i32..30, 1..6), version in 220i16..=225) {
        let total: i32 = durations.iter().sum();
        let mut rsa = RsaLine::new(version)
            .bill_id(5)
            .exit(7, 2022, '8', ' ')
            .duration(total);
        for duration in &durations {
            rsa = rsa.unit(RsaUnit::new(*duration, 'C').main_diagnosis("Z511"));
        }

        let mut out = Vec::new();
        parse_rsa_line(rsa.build().as_bytes(), &mut out, None).unwrap();
        prop_assert_eq!(out.len(), durations.len());
        prop_assert_eq!(out.last().unwrap().exit.date, Some(PmsiDate::new(2022, 7, 1)));
        for pair in out.windows(2) {
            prop_assert_eq!(pair[1].entry.date, pair[0].exit.date);
        }
        prop_assert_eq!(split_clusters(&out).count(), 1);
    }

    #[test]
    fn prop_rss_bill_ids_survive(bill_id in 1i32..99_999_999, admin_id in 1i32..99_999_999) {
        let line = RssLine::new(18).bill_id(bill_id).admin_id(admin_id).build();
        let mut out: Vec<Stay> = Vec::new();
        parse_rss_line(line.as_bytes(), &mut out, None).unwrap();
        prop_assert_eq!(out[0].bill_id, bill_id);
        prop_assert_eq!(out[0].admin_id, admin_id);
    }
}
