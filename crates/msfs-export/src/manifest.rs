//! LOD manifest generation
//!
//! Writes the `ModelInfo` XML that tells the simulator which model file to
//! use for each LOD:
//!
//! ```xml
//! <?xml version="1.0"?>
//! <ModelInfo version="1.1" guid="{0b8d3c7e-...}">
//!   <LODS>
//!     <LOD ModelFile="Wing_LOD0.gltf" minSize="0"/>
//!     <LOD ModelFile="Wing_LOD1.gltf" minSize="1000"/>
//!   </LODS>
//! </ModelInfo>
//! ```

use std::path::{Path, PathBuf};

use msfs_core::{ExportConfiguration, Guid, LodLevels};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use thiserror::Error;
use tracing::info;

/// Schema version written on the root element
pub const MANIFEST_VERSION: &str = "1.1";
/// Distance step between consecutive LODs
pub const LOD_MIN_SIZE_STEP: u32 = 1000;

/// Manifest errors
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Base path has no file name: {0}")]
    InvalidBasePath(PathBuf),
}

pub type ManifestResult<T> = Result<T, ManifestError>;

impl From<ManifestError> for msfs_core::Error {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::Io(e) => msfs_core::Error::Io(e),
            other => msfs_core::Error::Manifest {
                message: other.to_string(),
            },
        }
    }
}

fn xml_error(err: impl std::fmt::Display) -> ManifestError {
    ManifestError::Xml(err.to_string())
}

/// One LOD entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LodDescriptor {
    pub index: u8,
    pub model_file: String,
    pub min_size: u32,
}

impl LodDescriptor {
    /// `<base>_LOD<index>.<extension>` with a linear distance threshold
    pub fn new(base_name: &str, index: u8, extension: &str) -> Self {
        Self {
            index,
            model_file: format!("{base_name}_LOD{index}.{extension}"),
            min_size: u32::from(index) * LOD_MIN_SIZE_STEP,
        }
    }
}

/// In-memory manifest for one exported asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub version: String,
    pub guid: Guid,
    pub lods: Vec<LodDescriptor>,
}

impl Manifest {
    /// Manifest for LOD0 through `lod_levels`, stamped with a fresh GUID
    pub fn for_asset(base_name: &str, extension: &str, lod_levels: LodLevels) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            guid: Guid::new_v4(),
            lods: lod_levels
                .indices()
                .map(|i| LodDescriptor::new(base_name, i, extension))
                .collect(),
        }
    }

    /// Serialize with 2-space indentation
    pub fn to_xml(&self) -> ManifestResult<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", None, None)))
            .map_err(xml_error)?;

        let guid = self.guid.to_braced_string();
        let root = BytesStart::new("ModelInfo")
            .with_attributes([("version", self.version.as_str()), ("guid", guid.as_str())]);
        writer.write_event(Event::Start(root)).map_err(xml_error)?;
        writer
            .write_event(Event::Start(BytesStart::new("LODS")))
            .map_err(xml_error)?;

        for lod in &self.lods {
            let min_size = lod.min_size.to_string();
            let element = BytesStart::new("LOD").with_attributes([
                ("ModelFile", lod.model_file.as_str()),
                ("minSize", min_size.as_str()),
            ]);
            writer.write_event(Event::Empty(element)).map_err(xml_error)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("LODS")))
            .map_err(xml_error)?;
        writer
            .write_event(Event::End(BytesEnd::new("ModelInfo")))
            .map_err(xml_error)?;

        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        String::from_utf8(bytes).map_err(xml_error)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> ManifestResult<()> {
        std::fs::write(path, self.to_xml()?)?;
        Ok(())
    }
}

/// Build and write the manifest beside the mesh output
///
/// `base_path` is the asset's nominal model path (`<dir>/<name>.gltf`); the
/// manifest is written to `<dir>/<name>.xml` and its path returned.
pub fn generate_manifest(base_path: &Path, config: &ExportConfiguration) -> ManifestResult<PathBuf> {
    let base_name = base_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ManifestError::InvalidBasePath(base_path.to_path_buf()))?;
    let extension = base_path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or(msfs_core::config::MODEL_EXTENSION);

    let manifest = Manifest::for_asset(base_name, extension, config.lod_levels);
    let xml_path = base_path.with_extension("xml");
    manifest.write(&xml_path)?;

    info!(path = %xml_path.display(), guid = %manifest.guid, lods = manifest.lods.len(), "XML file generated");
    Ok(xml_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::Reader;

    /// (element name, attributes) for every start/empty element
    fn parse(xml: &str) -> Vec<(String, Vec<(String, String)>)> {
        let mut reader = Reader::from_str(xml);
        let mut elements = Vec::new();
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    let name = String::from_utf8(e.name().as_ref().to_vec()).unwrap();
                    let attrs = e
                        .attributes()
                        .map(|a| {
                            let a = a.unwrap();
                            (
                                String::from_utf8(a.key.as_ref().to_vec()).unwrap(),
                                String::from_utf8(a.value.to_vec()).unwrap(),
                            )
                        })
                        .collect();
                    elements.push((name, attrs));
                }
                Ok(_) => {}
                Err(e) => panic!("malformed XML: {e}"),
            }
        }
        elements
    }

    fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> &'a str {
        attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str()).unwrap()
    }

    fn is_braced_uuid(value: &str) -> bool {
        let Some(inner) = value.strip_prefix('{').and_then(|v| v.strip_suffix('}')) else {
            return false;
        };
        let groups: Vec<&str> = inner.split('-').collect();
        groups.iter().map(|g| g.len()).collect::<Vec<_>>() == [8, 4, 4, 4, 12]
            && groups.iter().all(|g| g.chars().all(|c| c.is_ascii_hexdigit()))
    }

    #[test]
    fn test_lod_entries_for_each_level() {
        for (levels, expected) in [
            (LodLevels::None, 1),
            (LodLevels::One, 2),
            (LodLevels::Two, 3),
            (LodLevels::Three, 4),
        ] {
            let xml = Manifest::for_asset("Wing", "gltf", levels).to_xml().unwrap();
            let elements = parse(&xml);

            let lods: Vec<_> = elements.iter().filter(|(n, _)| n == "LOD").collect();
            assert_eq!(lods.len(), expected);
            for (i, (_, attrs)) in lods.iter().enumerate() {
                assert_eq!(attr(attrs, "ModelFile"), format!("Wing_LOD{i}.gltf"));
                assert_eq!(attr(attrs, "minSize"), (i * 1000).to_string());
            }
        }
    }

    #[test]
    fn test_root_attributes() {
        let xml = Manifest::for_asset("Tail", "gltf", LodLevels::One).to_xml().unwrap();
        let elements = parse(&xml);

        assert_eq!(elements[0].0, "ModelInfo");
        assert_eq!(attr(&elements[0].1, "version"), "1.1");
        assert!(is_braced_uuid(attr(&elements[0].1, "guid")));
        assert_eq!(elements[1].0, "LODS");
    }

    #[test]
    fn test_indentation() {
        let xml = Manifest::for_asset("Wing", "gltf", LodLevels::None).to_xml().unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\"?>"));
        assert!(xml.contains("\n  <LODS>"));
        assert!(xml.contains("\n    <LOD ModelFile=\"Wing_LOD0.gltf\" minSize=\"0\"/>"));
        assert!(xml.contains("\n</ModelInfo>"));
    }

    #[test]
    fn test_fresh_guid_per_manifest() {
        let a = Manifest::for_asset("Wing", "gltf", LodLevels::One);
        let b = Manifest::for_asset("Wing", "gltf", LodLevels::One);
        assert_ne!(a.guid, b.guid);
    }

    #[test]
    fn test_generate_manifest_writes_beside_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfiguration::new(dir.path(), "Wing").with_lod_levels(LodLevels::Two);
        let base = dir.path().join("Wing.gltf");

        let path = generate_manifest(&base, &config).unwrap();

        assert_eq!(path, dir.path().join("Wing.xml"));
        let xml = std::fs::read_to_string(&path).unwrap();
        let sizes: Vec<_> = parse(&xml)
            .into_iter()
            .filter(|(n, _)| n == "LOD")
            .map(|(_, attrs)| attr(&attrs, "minSize").to_string())
            .collect();
        assert_eq!(sizes, ["0", "1000", "2000"]);
    }

    #[test]
    fn test_generate_manifest_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfiguration::new(dir.path(), "Wing");
        let base = dir.path().join("missing/dir/Wing.gltf");
        assert!(matches!(generate_manifest(&base, &config), Err(ManifestError::Io(_))));
    }
}
