mod api {
    pub use pmail::api::*;
}

mod cli {
    pub use pmail::cli::*;
}

mod context {
    pub use pmail::context::*;
}

mod error {
    pub use pmail::error::*;
}

mod output {
    pub use pmail::output::*;
}

mod list_under_test {
    #![allow(dead_code)]

    include!("../src/commands/list.rs");

    fn summary(seq: u32, seen: bool, flagged: bool) -> MessageSummary {
        MessageSummary {
            uid: Some(seq + 100),
            seq,
            from: "Ada Lovelace".to_string(),
            to: Vec::new(),
            subject: String::new(),
            date: Some("2026-10-12 09:30".to_string()),
            seen,
            flagged,
        }
    }

    #[test]
    fn page_overrides_offset() {
        assert_eq!(page_offset(None, 7, 20).expect("offset"), 7);
        assert_eq!(page_offset(Some(1), 7, 20).expect("offset"), 0);
        assert_eq!(page_offset(Some(3), 0, 20).expect("offset"), 40);
    }

    #[test]
    fn rejects_page_zero_and_overflow() {
        assert!(page_offset(Some(0), 0, 20).is_err());
        assert!(page_offset(Some(u32::MAX), 0, 20).is_err());
    }

    #[test]
    fn rows_mark_unread_and_flagged() {
        let rows = summary_rows(&[summary(9, false, true), summary(8, true, false)]);
        assert_eq!(rows[0][0], "9");
        assert_eq!(rows[0][1], "N*");
        assert_eq!(rows[1][1], "  ");
        assert_eq!(rows[0][3], "Ada Lovelace");
        assert_eq!(rows[0][4], "(no subject)");
    }
}
