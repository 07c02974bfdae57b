use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use super::sanitize;
use crate::error::{Error, ErrorKind};

/// Publication status as reported by the metadata provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(rename_all = "snake_case"))]
pub enum PublicationStatus {
    Publishing,
    Finished,
    OnHiatus,
    Discontinued,
    NotYetPublished,
}
impl PublicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicationStatus::Publishing => "Publishing",
            PublicationStatus::Finished => "Finished",
            PublicationStatus::OnHiatus => "On Hiatus",
            PublicationStatus::Discontinued => "Discontinued",
            PublicationStatus::NotYetPublished => "Not yet published",
        }
    }
}
impl FromStr for PublicationStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "publishing" | "ongoing" => Self::Publishing,
            "finished" | "completed" | "complete" => Self::Finished,
            "onhiatus" | "hiatus" => Self::OnHiatus,
            "discontinued" | "cancelled" => Self::Discontinued,
            "notyetpublished" | "upcoming" => Self::NotYetPublished,
            _ => exn::bail!(ErrorKind::ParseError {
                field: "status",
                value: format!("unknown publication status: {}", s)
            }),
        })
    }
}

impl Display for PublicationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Publishing", PublicationStatus::Publishing)]
    #[case("Finished", PublicationStatus::Finished)]
    #[case("On Hiatus", PublicationStatus::OnHiatus)]
    #[case("Discontinued", PublicationStatus::Discontinued)]
    #[case("Not yet published", PublicationStatus::NotYetPublished)]
    #[case("  finished ", PublicationStatus::Finished)]
    fn test_provider_labels(#[case] label: &str, #[case] expected: PublicationStatus) {
        assert_eq!(label.parse::<PublicationStatus>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_label() {
        assert!("Abandoned by the author's cat".parse::<PublicationStatus>().is_err());
    }
}
