use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// How a lookup query should be interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Selector {
    /// The provider's numeric ID.
    Id,
    /// Free-text title search.
    #[default]
    Title,
}
impl Selector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Selector::Id => "id",
            Selector::Title => "title",
        }
    }
}
impl FromStr for Selector {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Selector::Id),
            "title" => Ok(Selector::Title),
            other => exn::bail!(ErrorKind::InvalidArgument(format!("invalid selector {other:?}"))),
        }
    }
}
impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
