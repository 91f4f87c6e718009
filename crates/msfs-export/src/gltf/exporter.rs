//! glTF exporter implementation

use super::*;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use msfs_core::{ImageId, MaterialId};
use msfs_scene::{MeshData, SceneError, SceneRepository};
use tracing::debug;

use crate::mesh::{MeshExportError, MeshExportOptions, MeshExportReport, MeshExporter};
use crate::textures::texture_file_name;

type GltfResult<T> = Result<T, MeshExportError>;

/// glTF exporter
///
/// Buffers are rebuilt on every call, so one exporter can write every LOD.
#[derive(Debug, Default)]
pub struct GltfExporter {
    binary_data: Vec<u8>,
    accessors: Vec<Accessor>,
    buffer_views: Vec<BufferView>,
    materials: Vec<Material>,
    material_slots: HashMap<MaterialId, usize>,
    textures: Vec<Texture>,
    images: Vec<Image>,
    texture_slots: HashMap<ImageId, usize>,
}

impl GltfExporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.binary_data.clear();
        self.accessors.clear();
        self.buffer_views.clear();
        self.materials.clear();
        self.material_slots.clear();
        self.textures.clear();
        self.images.clear();
        self.texture_slots.clear();
    }

    fn check_options(options: &MeshExportOptions) -> GltfResult<()> {
        let unsupported = [
            (options.draco_compression, "draco compression"),
            (options.export_animations, "animations"),
            (options.export_lights, "lights"),
            (options.export_cameras, "cameras"),
        ];
        match unsupported.iter().find(|(enabled, _)| *enabled) {
            Some((_, what)) => Err(MeshExportError::Unsupported(what.to_string())),
            None => Ok(()),
        }
    }

    /// Build the glTF document for the current selection
    ///
    /// An empty selection gives a document with one empty scene. Objects
    /// without geometry are left out. Each object carries a single material,
    /// the one in its first slot, because [`MeshData`] has no per-face
    /// material assignment.
    fn build_gltf(
        &mut self,
        scene: &dyn SceneRepository,
        output_dir: &Path,
        options: &MeshExportOptions,
    ) -> GltfResult<(Gltf, usize)> {
        self.reset();

        let selection = scene.selected_objects();
        if selection.is_empty() {
            debug!("Nothing selected, writing an empty scene");
        }

        let scale = options.scale_factor;
        let baked = if options.apply_transforms { scale } else { 1.0 };

        let mut nodes = Vec::new();
        let mut meshes = Vec::new();
        let mut vertices = 0;

        for id in selection {
            let object = scene.object(id).ok_or(SceneError::UnknownObject(id))?;
            let Some(mesh) = object.mesh.as_ref().filter(|m| !m.positions.is_empty()) else {
                debug!(object = %object.name, "Object has no geometry, skipping");
                continue;
            };
            validate_mesh(&object.name, mesh)?;

            let mut attributes = BTreeMap::new();
            attributes.insert("POSITION".to_string(), self.add_positions(&mesh.positions, baked));
            if options.export_normals && !mesh.normals.is_empty() {
                attributes.insert("NORMAL".to_string(), self.add_vec3(&mesh.normals));
            }
            if options.export_texcoords && !mesh.uvs.is_empty() {
                attributes.insert("TEXCOORD_0".to_string(), self.add_uvs(&mesh.uvs));
            }
            let indices = self.add_indices(&mesh.indices);

            if object.materials.len() > 1 {
                debug!(object = %object.name, slots = object.materials.len(), "Only the first material slot is exported");
            }
            let material = match (options.export_materials, object.materials.first()) {
                (true, Some(&mid)) => self.material_slot(scene, mid, output_dir, &options.texture_dir),
                _ => None,
            };

            nodes.push(Node {
                name: Some(object.name.clone()),
                mesh: Some(meshes.len()),
                scale: (!options.apply_transforms && scale != 1.0).then_some([scale; 3]),
            });
            meshes.push(Mesh {
                name: Some(object.name.clone()),
                primitives: vec![Primitive {
                    attributes,
                    indices: Some(indices),
                    material,
                    mode: Some(MODE_TRIANGLES),
                }],
            });
            vertices += mesh.vertex_count();
        }

        let gltf = Gltf {
            asset: Asset::default(),
            scene: Some(0),
            scenes: vec![Scene {
                name: Some("Scene".to_string()),
                nodes: (0..nodes.len()).collect(),
            }],
            nodes,
            meshes,
            materials: std::mem::take(&mut self.materials),
            textures: std::mem::take(&mut self.textures),
            images: std::mem::take(&mut self.images),
            accessors: std::mem::take(&mut self.accessors),
            buffer_views: std::mem::take(&mut self.buffer_views),
            buffers: if self.binary_data.is_empty() {
                Vec::new()
            } else {
                vec![Buffer {
                    uri: None,
                    byte_length: self.binary_data.len(),
                }]
            },
        };
        Ok((gltf, vertices))
    }

    /// glTF material index for a scene material, created on first use
    fn material_slot(
        &mut self,
        scene: &dyn SceneRepository,
        id: MaterialId,
        output_dir: &Path,
        texture_dir: &Path,
    ) -> Option<usize> {
        if let Some(&slot) = self.material_slots.get(&id) {
            return Some(slot);
        }
        let material = scene.material(id)?;

        let base_color_texture = material
            .image_textures()
            .next()
            .and_then(|(_, image)| self.texture_slot(scene, image, output_dir, texture_dir))
            .map(|index| TextureInfo { index });

        let slot = self.materials.len();
        self.materials.push(Material {
            name: Some(material.name.clone()),
            pbr_metallic_roughness: Some(PbrMetallicRoughness {
                base_color_factor: Some([1.0, 1.0, 1.0, 1.0]),
                base_color_texture,
                metallic_factor: Some(0.0),
                roughness_factor: Some(0.5),
            }),
        });
        self.material_slots.insert(id, slot);
        Some(slot)
    }

    fn texture_slot(
        &mut self,
        scene: &dyn SceneRepository,
        id: ImageId,
        output_dir: &Path,
        texture_dir: &Path,
    ) -> Option<usize> {
        if let Some(&slot) = self.texture_slots.get(&id) {
            return Some(slot);
        }
        let image = scene.image(id)?;
        let target = texture_dir.join(texture_file_name(&image.name));

        self.images.push(Image {
            name: Some(image.name.clone()),
            uri: relative_uri(output_dir, &target),
        });
        let slot = self.textures.len();
        self.textures.push(Texture {
            source: self.images.len() - 1,
        });
        self.texture_slots.insert(id, slot);
        Some(slot)
    }

    fn add_positions(&mut self, positions: &[[f32; 3]], scale: f32) -> usize {
        let scaled: Vec<[f32; 3]> = positions
            .iter()
            .map(|p| [p[0] * scale, p[1] * scale, p[2] * scale])
            .collect();

        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for p in &scaled {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }

        let offset = self.push_bytes(bytemuck::cast_slice(&scaled));
        self.add_accessor(
            offset,
            scaled.len(),
            "VEC3",
            COMPONENT_TYPE_FLOAT,
            Some((min.to_vec(), max.to_vec())),
            TARGET_ARRAY_BUFFER,
        )
    }

    fn add_vec3(&mut self, data: &[[f32; 3]]) -> usize {
        let offset = self.push_bytes(bytemuck::cast_slice(data));
        self.add_accessor(offset, data.len(), "VEC3", COMPONENT_TYPE_FLOAT, None, TARGET_ARRAY_BUFFER)
    }

    fn add_uvs(&mut self, uvs: &[[f32; 2]]) -> usize {
        let offset = self.push_bytes(bytemuck::cast_slice(uvs));
        self.add_accessor(offset, uvs.len(), "VEC2", COMPONENT_TYPE_FLOAT, None, TARGET_ARRAY_BUFFER)
    }

    fn add_indices(&mut self, indices: &[u32]) -> usize {
        let offset = self.push_bytes(bytemuck::cast_slice(indices));
        self.add_accessor(
            offset,
            indices.len(),
            "SCALAR",
            COMPONENT_TYPE_UNSIGNED_INT,
            None,
            TARGET_ELEMENT_ARRAY_BUFFER,
        )
    }

    /// Append to the binary buffer, returning the start offset
    ///
    /// Every attribute is made of 4-byte components, so offsets stay aligned.
    fn push_bytes(&mut self, bytes: &[u8]) -> usize {
        let offset = self.binary_data.len();
        self.binary_data.extend_from_slice(bytes);
        offset
    }

    fn add_accessor(
        &mut self,
        offset: usize,
        count: usize,
        accessor_type: &str,
        component_type: u32,
        bounds: Option<(Vec<f32>, Vec<f32>)>,
        target: u32,
    ) -> usize {
        let buffer_view = self.buffer_views.len();
        self.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: Some(offset),
            byte_length: self.binary_data.len() - offset,
            target: Some(target),
        });

        let (min, max) = match bounds {
            Some((min, max)) => (Some(min), Some(max)),
            None => (None, None),
        };
        self.accessors.push(Accessor {
            buffer_view: Some(buffer_view),
            byte_offset: None,
            component_type,
            count,
            accessor_type: accessor_type.to_string(),
            max,
            min,
        });
        self.accessors.len() - 1
    }

    /// Write `<stem>.gltf` and, when there is geometry, `<stem>.bin`
    fn write_separate_files(
        &self,
        mut gltf: Gltf,
        output_path: &Path,
        pretty: bool,
    ) -> GltfResult<Vec<PathBuf>> {
        let json_path = output_path.with_extension("gltf");
        let bin_path = output_path.with_extension("bin");

        if let Some(buffer) = gltf.buffers.first_mut() {
            buffer.uri = bin_path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.replace(' ', "%20"));
        }

        let json = if pretty {
            serde_json::to_string_pretty(&gltf)?
        } else {
            serde_json::to_string(&gltf)?
        };
        std::fs::write(&json_path, json)?;
        if gltf.buffers.is_empty() {
            return Ok(vec![json_path]);
        }
        std::fs::write(&bin_path, &self.binary_data)?;

        Ok(vec![json_path, bin_path])
    }
}

impl MeshExporter for GltfExporter {
    fn export_selection(
        &mut self,
        scene: &dyn SceneRepository,
        output_path: &Path,
        options: &MeshExportOptions,
    ) -> Result<MeshExportReport, MeshExportError> {
        Self::check_options(options)?;

        let output_dir = output_path.parent().unwrap_or(Path::new(""));
        let (gltf, vertices) = self.build_gltf(scene, output_dir, options)?;
        let meshes = gltf.meshes.len();

        let files = self.write_separate_files(gltf, output_path, options.pretty_json)?;

        debug!(path = %output_path.display(), meshes, vertices, "Wrote glTF");
        Ok(MeshExportReport {
            files,
            meshes,
            vertices,
        })
    }
}

fn validate_mesh(object: &str, mesh: &MeshData) -> GltfResult<()> {
    let invalid = |message: String| MeshExportError::InvalidMeshData {
        object: object.to_string(),
        message,
    };

    if mesh.indices.len() % 3 != 0 {
        return Err(invalid(format!("{} indices is not a multiple of 3", mesh.indices.len())));
    }
    let count = mesh.positions.len();
    if let Some(&bad) = mesh.indices.iter().find(|&&i| i as usize >= count) {
        return Err(invalid(format!("index {bad} out of range for {count} vertices")));
    }
    if !mesh.normals.is_empty() && mesh.normals.len() != count {
        return Err(invalid(format!("{} normals for {count} vertices", mesh.normals.len())));
    }
    if !mesh.uvs.is_empty() && mesh.uvs.len() != count {
        return Err(invalid(format!("{} texcoords for {count} vertices", mesh.uvs.len())));
    }
    Ok(())
}

/// URI of `target` relative to the directory `from`, `/`-separated with
/// spaces percent-encoded
///
/// Falls back to `target` itself when the two paths share no prefix.
pub fn relative_uri(from: &Path, target: &Path) -> String {
    let encode = |s: String| s.replace('\\', "/").replace(' ', "%20");

    let from_parts: Vec<Component<'_>> = from.components().collect();
    let to_parts: Vec<Component<'_>> = target.components().collect();
    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    if common == 0 && (from.has_root() || target.has_root()) {
        return encode(target.to_string_lossy().into_owned());
    }

    let parts: Vec<String> = std::iter::repeat("..".to_string())
        .take(from_parts.len() - common)
        .chain(
            to_parts[common..]
                .iter()
                .map(|c| c.as_os_str().to_string_lossy().into_owned()),
        )
        .collect();
    encode(parts.join("/"))
}
