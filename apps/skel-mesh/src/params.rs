//! Command-line options for the mesh viewer.

use std::path::{Path, PathBuf};

/// Model loaded when `--model` is not given.
pub const DEFAULT_MODEL: &str = "assets/monkey_smooth.obj";

/// Which mesh to upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshShape {
    Triangle,
    Cube,
    Obj,
}

impl MeshShape {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "triangle" => Some(Self::Triangle),
            "cube" => Some(Self::Cube),
            "obj" => Some(Self::Obj),
            _ => None,
        }
    }
}

/// Mesh viewer options (from CLI or defaults).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshParams {
    pub shape: MeshShape,
    pub model: PathBuf,
    pub vsync: bool,
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            shape: MeshShape::Obj,
            model: PathBuf::from(DEFAULT_MODEL),
            vsync: false,
        }
    }
}

impl MeshParams {
    /// Parse options from the process arguments.
    pub fn from_args() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self::parse(&args, Path::exists)
    }

    /// Parse options, ignoring anything unrecognised.
    ///
    /// `--model` implies `--shape obj` unless a shape is given explicitly.
    /// With neither flag, the cube is shown when `model_exists` says the
    /// default model is missing.
    pub fn parse(args: &[String], model_exists: impl Fn(&Path) -> bool) -> Self {
        let mut params = Self::default();
        let mut explicit_shape = false;
        let mut explicit_model = false;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--model" => {
                    if let Some(path) = args.get(i + 1) {
                        params.model = PathBuf::from(path);
                        explicit_model = true;
                        if !explicit_shape {
                            params.shape = MeshShape::Obj;
                        }
                        i += 1;
                    }
                }
                "--shape" => {
                    if let Some(shape) = args.get(i + 1) {
                        match MeshShape::parse(shape) {
                            Some(shape) => {
                                params.shape = shape;
                                explicit_shape = true;
                            }
                            None => tracing::warn!("Unknown shape '{shape}', keeping {:?}", params.shape),
                        }
                        i += 1;
                    }
                }
                "--vsync" => params.vsync = true,
                _ => {}
            }
            i += 1;
        }

        if !explicit_shape && !explicit_model && !model_exists(&params.model) {
            tracing::info!("{} not found, showing the cube", params.model.display());
            params.shape = MeshShape::Cube;
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    fn parse(list: &[&str]) -> MeshParams {
        MeshParams::parse(&args(list), |_| true)
    }

    #[test]
    fn defaults_to_bundled_model() {
        let params = parse(&[]);
        assert_eq!(params, MeshParams::default());
        assert_eq!(params.shape, MeshShape::Obj);
        assert_eq!(params.model, PathBuf::from(DEFAULT_MODEL));
    }

    #[test]
    fn missing_default_model_shows_cube() {
        let params = MeshParams::parse(&[], |_| false);
        assert_eq!(params.shape, MeshShape::Cube);
        assert_eq!(params.model, PathBuf::from(DEFAULT_MODEL));

        let params = MeshParams::parse(&args(&["--vsync"]), |_| false);
        assert_eq!(params.shape, MeshShape::Cube);
        assert!(params.vsync);
    }

    #[test]
    fn explicit_choices_ignore_missing_default() {
        let params = MeshParams::parse(&args(&["--shape", "obj"]), |_| false);
        assert_eq!(params.shape, MeshShape::Obj);

        let params = MeshParams::parse(&args(&["--model", "scene.obj"]), |_| false);
        assert_eq!(params.shape, MeshShape::Obj);
        assert_eq!(params.model, PathBuf::from("scene.obj"));
    }

    #[test]
    fn shape_and_vsync() {
        let params = parse(&["--shape", "cube", "--vsync"]);
        assert_eq!(params.shape, MeshShape::Cube);
        assert!(params.vsync);
    }

    #[test]
    fn explicit_shape_wins_over_model() {
        let params = parse(&["--shape", "triangle", "--model", "a.obj"]);
        assert_eq!(params.shape, MeshShape::Triangle);
        assert_eq!(params.model, PathBuf::from("a.obj"));
    }

    #[test]
    fn model_selects_obj() {
        let params = parse(&["--model", "scene.obj"]);
        assert_eq!(params.shape, MeshShape::Obj);
        assert_eq!(params.model, PathBuf::from("scene.obj"));
    }

    #[test]
    fn unknown_shape_and_dangling_flags_are_ignored() {
        let params = parse(&["--shape", "sphere", "--model"]);
        assert_eq!(params, MeshParams::default());
    }
}
