//! Difference targets: what each discoverable difference reveals.
//!
//! Built once per session from the staged assets, then read-only.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::collab::{AssetStore, StagedAssets};
use crate::error::CollabError;
use crate::game::DifferenceId;
use crate::ws::protocol::{
    ActionType, OriginalPixelCluster, Pixel, PixelColor, Position2D, Reveal, SceneObjectUpdate,
};

/// Immutable map from difference id to its reveal payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DifferenceTargets {
    targets: BTreeMap<DifferenceId, Reveal>,
}

impl DifferenceTargets {
    pub fn new(targets: BTreeMap<DifferenceId, Reveal>) -> Self {
        Self { targets }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, id: DifferenceId) -> Option<&Reveal> {
        self.targets.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = DifferenceId> + '_ {
        self.targets.keys().copied()
    }
}

impl FromIterator<(DifferenceId, Reveal)> for DifferenceTargets {
    fn from_iter<I: IntoIterator<Item = (DifferenceId, Reveal)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Fetch the staged assets of a session and build its targets
pub async fn prepare_for_gameplay(
    staged: &StagedAssets,
    assets: &dyn AssetStore,
) -> Result<DifferenceTargets, CollabError> {
    match staged {
        StagedAssets::PixelHunt {
            original_url,
            difference_url,
        } => {
            let original = assets.fetch(original_url).await?;
            let difference = assets.fetch(difference_url).await?;
            tokio::task::spawn_blocking(move || pixel_targets(&original, &difference))
                .await
                .map_err(|e| CollabError::Decode(e.to_string()))?
        }
        StagedAssets::SceneDelta { scene_url } => {
            let scene = assets.fetch(scene_url).await?;
            scene_targets(&scene)
        }
    }
}

// ============================================================================
// PixelHunt
// ============================================================================

const WHITE: [u8; 3] = [255, 255, 255];

/// Every non-white pixel of the difference image is part of a difference.
/// 8-connected components, numbered in scan order from 0, are the differences;
/// each reveals the original image's pixels under it.
pub fn pixel_targets(original: &[u8], difference: &[u8]) -> Result<DifferenceTargets, CollabError> {
    let original = image::load_from_memory(original)
        .map_err(|e| CollabError::Decode(e.to_string()))?
        .to_rgb8();
    let difference = image::load_from_memory(difference)
        .map_err(|e| CollabError::Decode(e.to_string()))?
        .to_rgb8();

    if original.dimensions() != difference.dimensions() {
        return Err(CollabError::Decode(format!(
            "image sizes differ: original {:?}, difference {:?}",
            original.dimensions(),
            difference.dimensions()
        )));
    }

    let (width, height) = difference.dimensions();
    let is_marked = |x: u32, y: u32| difference.get_pixel(x, y).0 != WHITE;
    let mut visited = vec![false; (width as usize) * (height as usize)];
    let index = |x: u32, y: u32| (y as usize) * (width as usize) + x as usize;

    let mut targets = BTreeMap::new();
    let mut next_id: DifferenceId = 0;

    for y in 0..height {
        for x in 0..width {
            if visited[index(x, y)] || !is_marked(x, y) {
                continue;
            }

            let mut cluster = Vec::new();
            let mut stack = vec![(x, y)];
            visited[index(x, y)] = true;

            while let Some((cx, cy)) = stack.pop() {
                let [r, g, b] = original.get_pixel(cx, cy).0;
                cluster.push(Pixel {
                    position: Position2D { x: cx, y: cy },
                    color: PixelColor { r, g, b },
                });

                for (nx, ny) in neighbours(cx, cy, width, height) {
                    if !visited[index(nx, ny)] && is_marked(nx, ny) {
                        visited[index(nx, ny)] = true;
                        stack.push((nx, ny));
                    }
                }
            }

            cluster.sort_by_key(|p| (p.position.y, p.position.x));
            targets.insert(
                next_id,
                Reveal::PixelCluster(OriginalPixelCluster {
                    difference_key: next_id,
                    cluster,
                }),
            );
            next_id += 1;
        }
    }

    Ok(DifferenceTargets::new(targets))
}

fn neighbours(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let (x, y) = (x as i64, y as i64);
    (-1..=1)
        .flat_map(move |dy| (-1..=1).map(move |dx| (x + dx, y + dy)))
        .filter(move |&(nx, ny)| {
            (nx, ny) != (x, y) && nx >= 0 && ny >= 0 && nx < width as i64 && ny < height as i64
        })
        .map(|(nx, ny)| (nx as u32, ny as u32))
}

// ============================================================================
// SceneDelta
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneModifications {
    original_scene: SceneObjects,
    modified_scene: SceneObjects,
    modifications: Vec<Modification>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneObjects {
    #[serde(default)]
    scene_objects: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Modification {
    id: DifferenceId,
    #[serde(rename = "type")]
    kind: ModificationType,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
enum ModificationType {
    Added,
    Removed,
    ChangedColor,
    #[serde(other)]
    Unknown,
}

/// One target per modification, keyed by the modified object's index
pub fn scene_targets(scene: &[u8]) -> Result<DifferenceTargets, CollabError> {
    let scene: SceneModifications =
        serde_json::from_slice(scene).map_err(|e| CollabError::Decode(e.to_string()))?;

    let object = |objects: &SceneObjects, id: DifferenceId| {
        objects.scene_objects.get(id as usize).cloned()
    };

    Ok(scene
        .modifications
        .iter()
        .map(|m| {
            let update = match m.kind {
                ModificationType::Added => SceneObjectUpdate {
                    action_to_apply: ActionType::Remove,
                    scene_object: object(&scene.modified_scene, m.id),
                },
                ModificationType::Removed => SceneObjectUpdate {
                    action_to_apply: ActionType::Add,
                    scene_object: object(&scene.original_scene, m.id),
                },
                ModificationType::ChangedColor => SceneObjectUpdate {
                    action_to_apply: ActionType::ChangeColor,
                    scene_object: object(&scene.original_scene, m.id),
                },
                ModificationType::Unknown => SceneObjectUpdate {
                    action_to_apply: ActionType::ChangeColor,
                    scene_object: None,
                },
            };
            (m.id, Reveal::SceneObject(update))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn bmp(image: &RgbImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Bmp).unwrap();
        buf.into_inner()
    }

    fn white(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(WHITE))
    }

    #[test]
    fn separate_blobs_become_separate_differences() {
        let original = RgbImage::from_pixel(6, 4, Rgb([10, 20, 30]));
        let mut difference = white(6, 4);
        // diagonal pair, 8-connected
        difference.put_pixel(0, 0, Rgb([0, 0, 0]));
        difference.put_pixel(1, 1, Rgb([0, 0, 0]));
        // isolated pixel far away
        difference.put_pixel(5, 3, Rgb([0, 0, 0]));

        let targets = pixel_targets(&bmp(&original), &bmp(&difference)).unwrap();
        assert_eq!(targets.len(), 2);

        match targets.get(0) {
            Some(Reveal::PixelCluster(cluster)) => {
                assert_eq!(cluster.difference_key, 0);
                assert_eq!(cluster.cluster.len(), 2);
                assert_eq!(cluster.cluster[0].position, Position2D { x: 0, y: 0 });
                assert_eq!(cluster.cluster[0].color, PixelColor { r: 10, g: 20, b: 30 });
            }
            other => panic!("unexpected target: {:?}", other),
        }
        match targets.get(1) {
            Some(Reveal::PixelCluster(cluster)) => {
                assert_eq!(cluster.cluster[0].position, Position2D { x: 5, y: 3 });
            }
            other => panic!("unexpected target: {:?}", other),
        }
    }

    #[test]
    fn blank_difference_image_has_no_targets() {
        let targets = pixel_targets(&bmp(&white(3, 3)), &bmp(&white(3, 3))).unwrap();
        assert!(targets.is_empty());
    }

    #[test]
    fn mismatched_sizes_are_rejected() {
        let result = pixel_targets(&bmp(&white(3, 3)), &bmp(&white(4, 3)));
        assert!(matches!(result, Err(CollabError::Decode(_))));
    }

    #[test]
    fn scene_modifications_map_to_updates() {
        let scene = serde_json::json!({
            "originalScene": { "sceneObjects": [ { "name": "cube" }, { "name": "cone" } ] },
            "modifiedScene": { "sceneObjects": [ { "name": "cube-red" }, { "name": "cone" }, { "name": "torus" } ] },
            "modifications": [
                { "id": 0, "type": "changedColor" },
                { "id": 2, "type": "added" },
                { "id": 1, "type": "removed" }
            ]
        });
        let targets = scene_targets(&serde_json::to_vec(&scene).unwrap()).unwrap();

        assert_eq!(targets.ids().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(
            targets.get(2),
            Some(&Reveal::SceneObject(SceneObjectUpdate {
                action_to_apply: ActionType::Remove,
                scene_object: Some(serde_json::json!({ "name": "torus" })),
            }))
        );
        assert_eq!(
            targets.get(0),
            Some(&Reveal::SceneObject(SceneObjectUpdate {
                action_to_apply: ActionType::ChangeColor,
                scene_object: Some(serde_json::json!({ "name": "cube" })),
            }))
        );
    }

    #[test]
    fn malformed_scene_is_a_decode_error() {
        assert!(matches!(scene_targets(b"not json"), Err(CollabError::Decode(_))));
    }
}
