/// Status of a single named sub-collection in the per-collection table.
///
/// Sentinels are compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionStatus {
    Completed,
    Failed,
    Pending(String),
}

impl CollectionStatus {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case(crate::fields::STATUS_COMPLETED) {
            Self::Completed
        } else if trimmed.eq_ignore_ascii_case(crate::fields::STATUS_FAILED) {
            Self::Failed
        } else {
            Self::Pending(trimmed.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_ignore_case() {
        assert_eq!(CollectionStatus::parse("COMPLETED"), CollectionStatus::Completed);
        assert_eq!(CollectionStatus::parse("completed "), CollectionStatus::Completed);
        assert_eq!(CollectionStatus::parse("failed"), CollectionStatus::Failed);
        assert_eq!(
            CollectionStatus::parse("Exporting"),
            CollectionStatus::Pending("Exporting".into())
        );
    }
}
