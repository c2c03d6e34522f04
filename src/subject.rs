//! Subject-property attribute extraction.

use tracing::debug;

use crate::matrix;
use crate::session::SessionDriver;

/// Attributes of the property being valued.
///
/// Extraction is deliberately best-effort: a field whose source text is
/// missing or unparsable is recorded as zero rather than failing the run,
/// so a partially readable record still produces an estimate. Whether an
/// all-zero subject should instead be reported as incomplete data is an open
/// product question (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SubjectProperty {
    pub beds: i64,
    pub baths: i64,
    pub sqft: i64,
    pub acres: f64,
    pub year_built: i64,
}

/// Reads the subject record currently on screen. Never fails.
pub async fn extract_subject(session: &dyn SessionDriver) -> SubjectProperty {
    SubjectProperty {
        beds: labeled_int(session, matrix::BEDS_LABEL).await,
        baths: labeled_int(session, matrix::BATHS_LABEL).await,
        sqft: labeled_int(session, matrix::SQFT_LABEL).await,
        acres: labeled_decimal(session, matrix::ACRES_LABEL).await,
        year_built: labeled_int(session, matrix::YEAR_BUILT_LABEL).await,
    }
}

async fn labeled_text(session: &dyn SessionDriver, label: &str) -> Option<String> {
    let element = session.find(&matrix::detail_field(label)).await.ok()?;
    let text = session.text(&element).await.ok()?;
    Some(text.trim().replace(',', ""))
}

async fn labeled_int(session: &dyn SessionDriver, label: &str) -> i64 {
    match labeled_text(session, label).await.and_then(|t| t.parse().ok()) {
        Some(value) => value,
        None => {
            debug!(label, "subject field missing or unparsable, defaulting to 0");
            0
        }
    }
}

async fn labeled_decimal(session: &dyn SessionDriver, label: &str) -> f64 {
    match labeled_text(session, label).await.and_then(|t| t.parse().ok()) {
        Some(value) => value,
        None => {
            debug!(label, "subject field missing or unparsable, defaulting to 0.0");
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::fake::FakeSession;

    #[tokio::test]
    async fn parses_labeled_fields_and_strips_separators() {
        let session = FakeSession::new().with_subject(&[
            ("# Beds", "3"),
            ("# Baths", "2"),
            ("SqFt", "1,500"),
            ("Acres", "0.2"),
            ("Year Built", "2000"),
        ]);
        let subject = extract_subject(&session).await;
        assert_eq!(subject.beds, 3);
        assert_eq!(subject.baths, 2);
        assert_eq!(subject.sqft, 1500);
        assert_eq!(subject.acres, 0.2);
        assert_eq!(subject.year_built, 2000);
    }

    #[tokio::test]
    async fn unparsable_field_defaults_without_aborting_the_rest() {
        let session = FakeSession::new().with_subject(&[
            ("# Beds", "abc"),
            ("# Baths", "2"),
            ("SqFt", "1,500"),
        ]);
        let subject = extract_subject(&session).await;
        assert_eq!(subject.beds, 0);
        assert_eq!(subject.baths, 2);
        assert_eq!(subject.sqft, 1500);
        // missing elements default as well
        assert_eq!(subject.acres, 0.0);
        assert_eq!(subject.year_built, 0);
    }
}
