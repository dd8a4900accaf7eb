use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! opaque_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

opaque_id!(SheetId, "Opaque 128-bit identity of a Sheet.");
opaque_id!(VersionId, "Opaque 128-bit identity of a Sheet Version snapshot.");
opaque_id!(NodeId, "Opaque 128-bit identity of a Node, unique within its Sheet.");

/// A Sheet plus an optional pinned Version: the key under which a compiled
/// unit is cached during a single compilation (see `CompilationUnit` in
/// `spec.md` §3).
#[derive(Clone, Copy, PartialEq, Eq, Ord, PartialOrd, Hash, Debug)]
pub struct SheetRef {
    pub sheet_id: SheetId,
    pub version_id: Option<VersionId>,
}

impl SheetRef {
    pub fn root(sheet_id: SheetId) -> Self {
        Self {
            sheet_id,
            version_id: None,
        }
    }

    pub fn pinned(sheet_id: SheetId, version_id: VersionId) -> Self {
        Self {
            sheet_id,
            version_id: Some(version_id),
        }
    }
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version_id {
            Some(v) => write!(f, "{}@{}", self.sheet_id, v),
            None => write!(f, "{}", self.sheet_id),
        }
    }
}
