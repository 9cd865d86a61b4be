use crate::model::{UploadRecord, VISIBLE_TO_ALL};

/// Decide whether a viewer may see an upload record. Pure and
/// deterministic: identical inputs always give the same answer, which is
/// what lets the query workflow run it over the whole store.
///
/// Rule order, first match wins:
/// 1. admin viewers see everything
/// 2. owners see their own uploads
/// 3. the "ALL" sentinel opens the record to everyone
/// 4. an exact email match in the visibility list
///
/// Role comparison is case-insensitive; the email comparisons in rules 2
/// and 4 are case-sensitive.
pub fn can_view(record: &UploadRecord, viewer_email: &str, viewer_role: &str) -> bool {
    if viewer_role.trim().eq_ignore_ascii_case("admin") {
        return true;
    }
    if record.uploaded_by == viewer_email {
        return true;
    }
    if record.visible_to.iter().any(|v| v == VISIBLE_TO_ALL) {
        return true;
    }
    record.visible_to.iter().any(|v| v == viewer_email)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(uploaded_by: &str, visible_to: &[&str]) -> UploadRecord {
        UploadRecord {
            id: 1,
            file_name: "hw.pdf".into(),
            uploaded_by: uploaded_by.into(),
            role: "TEACHER".into(),
            file_path: "uploads/teachers/hw.pdf".into(),
            timestamp: "2025-01-01 09:00:00".into(),
            file_size: 42,
            visible_to: visible_to.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn admin_sees_everything_regardless_of_list() {
        let r = record("t@x.edu", &[]);
        assert!(can_view(&r, "someone@x.edu", "ADMIN"));
        assert!(can_view(&r, "someone@x.edu", "admin"));
        assert!(can_view(&r, "", "Admin"));
    }

    #[test]
    fn owner_always_sees_own_upload() {
        let r = record("t@x.edu", &[]);
        assert!(can_view(&r, "t@x.edu", "TEACHER"));
        assert!(can_view(&r, "t@x.edu", "STUDENT"));
    }

    #[test]
    fn all_sentinel_opens_record_to_every_role() {
        let r = record("t@x.edu", &["ALL"]);
        for role in ["STUDENT", "TEACHER", "PRINCIPAL", "ADMIN"] {
            assert!(can_view(&r, "anyone@x.edu", role));
        }
    }

    #[test]
    fn empty_list_is_private_to_owner_and_admin() {
        let r = record("s@x.edu", &[]);
        assert!(!can_view(&r, "other@x.edu", "STUDENT"));
        assert!(!can_view(&r, "other@x.edu", "TEACHER"));
        assert!(can_view(&r, "other@x.edu", "ADMIN"));
        assert!(can_view(&r, "s@x.edu", "STUDENT"));
    }

    #[test]
    fn listed_email_grants_access() {
        let r = record("t@x.edu", &["s1@x.edu", "s2@x.edu"]);
        assert!(can_view(&r, "s1@x.edu", "STUDENT"));
        assert!(can_view(&r, "s2@x.edu", "STUDENT"));
        assert!(!can_view(&r, "s3@x.edu", "STUDENT"));
    }

    #[test]
    fn email_match_is_case_sensitive_while_role_is_not() {
        let r = record("t@x.edu", &["S1@x.edu"]);
        assert!(!can_view(&r, "s1@x.edu", "STUDENT"));
        assert!(can_view(&r, "S1@x.edu", "sTuDeNt"));
        // Owner rule is exact-match too.
        assert!(!can_view(&r, "T@x.edu", "TEACHER"));
    }

    #[test]
    fn empty_viewer_email_falls_through_to_false() {
        let r = record("t@x.edu", &["s1@x.edu"]);
        assert!(!can_view(&r, "", "STUDENT"));
    }
}
