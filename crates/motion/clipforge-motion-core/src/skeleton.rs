//! Read-only bone hierarchy.
//!
//! The skeleton is constructor-injected into every operation that needs it;
//! there is no global bone-name cache. The name lookup map is baked once at
//! construction.

use clipforge_api_core::{CoreError, Transform};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    /// Parent bone index; `None` only for the root (index 0).
    pub parent: Option<usize>,
    /// Reference-pose local transform.
    pub reference_local: Transform,
}

impl Bone {
    pub fn new(name: impl Into<String>, parent: Option<usize>, reference_local: Transform) -> Self {
        Self {
            name: name.into(),
            parent,
            reference_local,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "SkeletonData", into = "SkeletonData")]
pub struct Skeleton {
    bones: Vec<Bone>,
    index: HashMap<String, usize>,
}

/// Serialized shape of a skeleton: the bone list alone; the name index is
/// rebuilt (and the hierarchy re-validated) on load.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct SkeletonData {
    bones: Vec<Bone>,
}

impl TryFrom<SkeletonData> for Skeleton {
    type Error = CoreError;
    fn try_from(data: SkeletonData) -> Result<Self, Self::Error> {
        Skeleton::new(data.bones)
    }
}

impl From<Skeleton> for SkeletonData {
    fn from(skeleton: Skeleton) -> Self {
        SkeletonData {
            bones: skeleton.bones,
        }
    }
}

impl Skeleton {
    /// Validates the hierarchy: non-empty, root has no parent, every other
    /// bone's parent precedes it, names are unique.
    pub fn new(bones: Vec<Bone>) -> Result<Self, CoreError> {
        if bones.is_empty() {
            return Err(CoreError::InvalidSkeleton("no bones".into()));
        }
        if bones[0].parent.is_some() {
            return Err(CoreError::InvalidSkeleton(
                "root bone must not have a parent".into(),
            ));
        }
        let mut index = HashMap::with_capacity(bones.len());
        for (i, bone) in bones.iter().enumerate() {
            if i > 0 {
                match bone.parent {
                    Some(p) if p < i => {}
                    _ => {
                        return Err(CoreError::InvalidSkeleton(format!(
                            "bone '{}' has an invalid parent",
                            bone.name
                        )))
                    }
                }
            }
            if index.insert(bone.name.clone(), i).is_some() {
                return Err(CoreError::InvalidSkeleton(format!(
                    "duplicate bone name '{}'",
                    bone.name
                )));
            }
        }
        Ok(Self { bones, index })
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn bone_name(&self, index: usize) -> Option<&str> {
        self.bones.get(index).map(|b| b.name.as_str())
    }

    pub fn root_name(&self) -> &str {
        &self.bones[0].name
    }

    pub fn parent_index(&self, index: usize) -> Option<usize> {
        self.bones.get(index).and_then(|b| b.parent)
    }

    pub fn reference_local(&self, index: usize) -> Transform {
        self.bones
            .get(index)
            .map(|b| b.reference_local)
            .unwrap_or(Transform::IDENTITY)
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn is_descendant_of(&self, child: usize, ancestor: usize) -> bool {
        let mut cur = self.parent_index(child);
        while let Some(i) = cur {
            if i == ancestor {
                return true;
            }
            cur = self.parent_index(i);
        }
        false
    }

    /// Reference pose of a bone composed up to the root (component space).
    pub fn reference_component(&self, index: usize) -> Transform {
        let mut acc = Transform::IDENTITY;
        let mut cur = Some(index);
        while let Some(i) = cur {
            acc = acc.compose(&self.reference_local(i));
            cur = self.parent_index(i);
        }
        acc
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple() -> Skeleton {
        Skeleton::new(vec![
            Bone::new("root", None, Transform::IDENTITY),
            Bone::new("pelvis", Some(0), Transform::IDENTITY),
            Bone::new("thigh_l", Some(1), Transform::IDENTITY),
        ])
        .unwrap()
    }

    #[test]
    fn lookup_and_hierarchy() {
        let skel = simple();
        assert_eq!(skel.bone_index("pelvis"), Some(1));
        assert_eq!(skel.bone_index("missing"), None);
        assert_eq!(skel.parent_index(2), Some(1));
        assert!(skel.is_descendant_of(2, 0));
        assert!(!skel.is_descendant_of(0, 2));
    }

    #[test]
    fn reference_component_composes_chain() {
        let skel = Skeleton::new(vec![
            Bone::new("root", None, Transform::IDENTITY),
            Bone::new(
                "pelvis",
                Some(0),
                Transform::from_translation(glam::Vec3::new(0.0, 0.0, 90.0)),
            ),
            Bone::new(
                "spine",
                Some(1),
                Transform::from_translation(glam::Vec3::new(0.0, 0.0, 20.0)),
            ),
        ])
        .unwrap();
        let cs = skel.reference_component(2);
        assert!((cs.translation.z - 110.0).abs() < 1e-5);
    }

    #[test]
    fn rejects_bad_hierarchies() {
        assert!(Skeleton::new(vec![]).is_err());
        assert!(Skeleton::new(vec![Bone::new("root", Some(0), Transform::IDENTITY)]).is_err());
        assert!(Skeleton::new(vec![
            Bone::new("root", None, Transform::IDENTITY),
            Bone::new("root", Some(0), Transform::IDENTITY),
        ])
        .is_err());
    }
}
