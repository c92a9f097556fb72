//! Dataset loader for the preprocessed array files.
//!
//! The preprocessing stage (external to this crate) writes four `.npy`
//! arrays into a directory whose name encodes the dataset version:
//! `processed_data/processed_data_<N>-<S>/`, where `N` is the image count
//! and `S` the image side length. Loading is a pure read.

use std::path::{Path, PathBuf};

use ndarray::{Array1, Array4};
use ndarray_npy::ReadNpyExt;

use crate::error::{Error, Result};

/// The four array files a processed-data directory must contain.
const X_TRAIN: &str = "X_train.npy";
const X_VAL: &str = "X_val.npy";
const Y_TRAIN: &str = "y_train.npy";
const Y_VAL: &str = "y_val.npy";

/// A loaded dataset: training partition plus held-out validation partition.
///
/// Features are `(n, height, width, channels)`, labels are binary `(n,)`.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub x_train: Array4<f32>,
    pub y_train: Array1<f32>,
    pub x_val: Array4<f32>,
    pub y_val: Array1<f32>,
}

impl Dataset {
    /// Conventional directory for a given dataset version.
    pub fn data_dir(image_number: usize, image_size: usize) -> PathBuf {
        PathBuf::from("processed_data").join(format!("processed_data_{image_number}-{image_size}"))
    }

    /// Load all four arrays from `dir`.
    ///
    /// Fails with [`Error::DataNotFound`] if any file is absent and with
    /// [`Error::ShapeMismatch`] if feature and label counts disagree within
    /// a partition.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        let x_train: Array4<f32> = read_array(dir.join(X_TRAIN))?;
        let x_val: Array4<f32> = read_array(dir.join(X_VAL))?;
        let y_train: Array1<f32> = read_array(dir.join(Y_TRAIN))?;
        let y_val: Array1<f32> = read_array(dir.join(Y_VAL))?;

        check_partition("train", &x_train, &y_train)?;
        check_partition("validation", &x_val, &y_val)?;

        Ok(Self {
            x_train,
            y_train,
            x_val,
            y_val,
        })
    }

    /// Spatial input shape `(height, width, channels)` of the feature arrays.
    pub fn input_shape(&self) -> (usize, usize, usize) {
        let s = self.x_train.shape();
        (s[1], s[2], s[3])
    }

    /// Number of training samples.
    pub fn train_len(&self) -> usize {
        self.y_train.len()
    }

    /// One line per loaded array, shape included, for startup logging.
    pub fn describe(&self) -> String {
        format!(
            "X_train shape: {:?}\ny_train shape: ({},)\nX_val shape: {:?}\ny_val shape: ({},)",
            self.x_train.dim(),
            self.y_train.len(),
            self.x_val.dim(),
            self.y_val.len()
        )
    }
}

fn read_array<A: ReadNpyExt>(path: PathBuf) -> Result<A> {
    if !path.exists() {
        return Err(Error::DataNotFound { path });
    }
    let file = std::fs::File::open(&path)?;
    A::read_npy(file).map_err(|source| Error::ArrayRead { path, source })
}

fn check_partition(partition: &'static str, x: &Array4<f32>, y: &Array1<f32>) -> Result<()> {
    if x.shape()[0] != y.len() {
        return Err(Error::ShapeMismatch {
            partition,
            features: x.shape()[0],
            labels: y.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use ndarray_npy::WriteNpyExt;
    use std::fs::File;

    fn write_partition(dir: &Path, n_train: usize, n_val: usize, side: usize) {
        let x_train = Array4::<f32>::zeros((n_train, side, side, 3));
        let x_val = Array4::<f32>::zeros((n_val, side, side, 3));
        let y_train = Array1::<f32>::zeros(n_train);
        let y_val = Array1::<f32>::zeros(n_val);
        x_train.write_npy(File::create(dir.join(X_TRAIN)).unwrap()).unwrap();
        x_val.write_npy(File::create(dir.join(X_VAL)).unwrap()).unwrap();
        y_train.write_npy(File::create(dir.join(Y_TRAIN)).unwrap()).unwrap();
        y_val.write_npy(File::create(dir.join(Y_VAL)).unwrap()).unwrap();
    }

    #[test]
    fn loads_a_complete_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_partition(dir.path(), 10, 4, 8);

        let ds = Dataset::load(dir.path()).unwrap();
        assert_eq!(ds.train_len(), 10);
        assert_eq!(ds.input_shape(), (8, 8, 3));
        assert_eq!(ds.y_val.len(), 4);
    }

    #[test]
    fn missing_file_is_data_not_found() {
        let dir = tempfile::tempdir().unwrap();
        write_partition(dir.path(), 10, 4, 8);
        std::fs::remove_file(dir.path().join(Y_VAL)).unwrap();

        match Dataset::load(dir.path()) {
            Err(Error::DataNotFound { path }) => {
                assert!(path.ends_with(Y_VAL));
            }
            other => panic!("expected DataNotFound, got {other:?}"),
        }
    }

    #[test]
    fn misaligned_partition_is_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        write_partition(dir.path(), 10, 4, 8);
        // Overwrite y_train with the wrong length.
        let bad = Array1::<f32>::zeros(9);
        bad.write_npy(File::create(dir.path().join(Y_TRAIN)).unwrap()).unwrap();

        match Dataset::load(dir.path()) {
            Err(Error::ShapeMismatch {
                partition,
                features,
                labels,
            }) => {
                assert_eq!(partition, "train");
                assert_eq!(features, 10);
                assert_eq!(labels, 9);
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn describe_reports_all_four_shapes() {
        let dir = tempfile::tempdir().unwrap();
        write_partition(dir.path(), 10, 4, 8);

        let ds = Dataset::load(dir.path()).unwrap();
        assert_eq!(
            ds.describe(),
            "X_train shape: (10, 8, 8, 3)\ny_train shape: (10,)\n\
             X_val shape: (4, 8, 8, 3)\ny_val shape: (4,)"
        );
    }

    #[test]
    fn data_dir_encodes_version() {
        let dir = Dataset::data_dir(2000, 224);
        assert_eq!(
            dir,
            PathBuf::from("processed_data/processed_data_2000-224")
        );
    }
}
