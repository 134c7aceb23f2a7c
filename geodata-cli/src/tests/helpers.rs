//! Temporary data source files shared by the CLI tests.

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

pub(super) const SHOPS_CSV: &str = "\
Bing Spatial Data Services, 1.0, Shop
EntityID(Edm.String,primaryKey),Name(Edm.String),AddressLine(Edm.String),Locality(Edm.String),Latitude(Edm.Double),Longitude(Edm.Double)
1,Corner Shop,1 High St,Leeds,53.8,-1.55
2,Market Stall,2 Low Rd,York,,
";

pub(super) const OVERSIZED_CSV: &str = "\
Bing Spatial Data Services, 1.0, Shop
EntityID(Edm.String,primaryKey),Name(Edm.String),Latitude(Edm.Double),Longitude(Edm.Double)
1,Corner Shop,95.0,-1.55
";

/// A scratch directory holding data source files.
pub(super) struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub(super) fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        let root = Utf8Path::from_path(self.dir.path()).expect("utf-8 tempdir");
        root.join(name)
    }

    pub(super) fn write(&self, name: &str, contents: &str) -> Utf8PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).expect("write fixture");
        path
    }

    pub(super) fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).expect("read output")
    }
}

/// Stdout replacement capturing command output.
pub(super) fn output_json(buffer: &[u8]) -> serde_json::Value {
    serde_json::from_slice(buffer).expect("command output is JSON")
}
