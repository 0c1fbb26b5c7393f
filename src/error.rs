//! Error types.
//!
//! None of these are fatal: skeleton problems come back from validation as
//! values, texture failures are absorbed by the brush engine, and colour
//! parsing is a convenience for hosts that store colours as hex strings.

/// A structural problem in a bone hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkeletonError {
    #[error("orphan bone {bone}: parent {parent} does not exist")]
    OrphanBone { bone: String, parent: String },
    #[error("self-parent cycle: bone {bone} is its own parent")]
    SelfParent { bone: String },
    #[error("deep cycle: bone {bone} reaches {repeated} twice while walking to the root")]
    DeepCycle { bone: String, repeated: String },
}

impl SkeletonError {
    /// Id of the bone whose parent chain failed validation.
    pub fn bone_id(&self) -> &str {
        match self {
            SkeletonError::OrphanBone { bone, .. }
            | SkeletonError::SelfParent { bone }
            | SkeletonError::DeepCycle { bone, .. } => bone,
        }
    }
}

/// Why a brush texture could not be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextureError {
    #[error("texture {0} could not be decoded: {1}")]
    Decode(String, String),
    #[error("texture {0} is missing")]
    Missing(String),
    #[error("texture {id} has {actual} bytes, expected {expected} for {width}x{height} rgba")]
    BadLength {
        id: String,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorParseError {
    #[error("invalid hex color: {0:?}")]
    InvalidHex(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton_error_messages() {
        let e = SkeletonError::OrphanBone {
            bone: "arm".into(),
            parent: "torso".into(),
        };
        assert_eq!(e.to_string(), "orphan bone arm: parent torso does not exist");
        assert_eq!(e.bone_id(), "arm");

        let e = SkeletonError::SelfParent { bone: "tail".into() };
        assert!(e.to_string().contains("self-parent"));
    }
}
