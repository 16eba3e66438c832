//! Plant disease prediction for a single image.
//!

use ndarray::Array4;
use std::path::Path;

use crate::module::error::ClassifyError;
use crate::module::util::conf;
use crate::module::vision::background::{BackgroundRemover, KeepAll, OnnxMatting};
use crate::module::vision::classifier::{self, onnx::OnnxClassifier, Classifier, Prediction};
use crate::module::vision::labels::LabelMap;
use crate::module::vision::preprocess;

/// Result of classifying one image path.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    Predicted(Prediction),
    /// The image file does not exist.
    ImageMissing,
}

/// Model, labels and background remover, loaded once and never mutated.
pub struct Predictor {
    remover: Box<dyn BackgroundRemover>,
    classifier: Box<dyn Classifier>,
    labels: LabelMap,
    image_size: u32,
}

impl Predictor {
    /// Bundle the parts and check the labels cover the model's output width.
    ///
    /// The width is taken from one probe inference on a blank input.
    pub fn new(
        remover: Box<dyn BackgroundRemover>,
        classifier: Box<dyn Classifier>,
        labels: LabelMap,
        image_size: u32,
    ) -> Result<Self, ClassifyError> {
        let sz = image_size as usize;
        let width = classifier.predict(&Array4::zeros((1, sz, sz, 3)))?.len();
        labels.ensure_width(width)?;
        log::info!("Classifier ready with {} classes", width);
        Ok(Self {
            remover,
            classifier,
            labels,
            image_size,
        })
    }

    /// Load everything named by the `[classifier]` section.
    ///
    /// Missing files are reported before any model is loaded.
    pub fn load(conf: &conf::Classifier) -> Result<Self, ClassifyError> {
        require("model", &conf.model_path)?;
        if conf.remove_background {
            require("background model", &conf.matting_model_path)?;
        }
        let labels = LabelMap::load(Path::new(&conf.class_indices_path))?;

        let classifier = OnnxClassifier::new(&conf.model_path, conf.intra_threads)?;
        let remover: Box<dyn BackgroundRemover> = if conf.remove_background {
            Box::new(OnnxMatting::new(&conf.matting_model_path, conf.intra_threads)?)
        } else {
            Box::new(KeepAll)
        };
        Self::new(remover, Box::new(classifier), labels, conf.image_size)
    }

    /// Preprocess and classify the image at `path`.
    pub fn predict_image(&self, path: &Path) -> Result<PredictionOutcome, ClassifyError> {
        let input = match preprocess::load_and_preprocess(path, self.remover.as_ref(), self.image_size)? {
            Some(input) => input,
            None => return Ok(PredictionOutcome::ImageMissing),
        };
        let probabilities = self.classifier.predict(&input)?;
        let prediction = self.resolve(&probabilities)?;
        log::info!(
            "{}: {} ({:.2}%)",
            path.display(),
            prediction.label,
            prediction.confidence
        );
        Ok(PredictionOutcome::Predicted(prediction))
    }

    /// Map a probability vector to its top label.
    pub fn resolve(&self, probabilities: &[f32]) -> Result<Prediction, ClassifyError> {
        let (index, prob) = classifier::top(probabilities)?;
        let label = self.labels.get(index).ok_or(ClassifyError::UnknownClass(index))?;
        Ok(Prediction {
            index,
            label: label.to_owned(),
            confidence: prob * 100.0,
        })
    }
}

fn require(kind: &'static str, path: &str) -> Result<(), ClassifyError> {
    let path = Path::new(path);
    if !path.is_file() {
        return Err(ClassifyError::Missing {
            kind,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::error::VisionError;
    use image::{Rgba, RgbaImage};

    /// Returns the same probabilities for every input.
    struct Fixed(Vec<f32>);

    impl Classifier for Fixed {
        fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, VisionError> {
            assert_eq!(input.shape(), &[1, 224, 224, 3]);
            Ok(self.0.clone())
        }
    }

    fn predictor(probs: Vec<f32>) -> Predictor {
        let labels = LabelMap::from_json(r#"{"Healthy": 0, "Blight": 1}"#).unwrap();
        Predictor::new(Box::new(KeepAll), Box::new(Fixed(probs)), labels, 224).unwrap()
    }

    #[test]
    fn resolve_top_label() {
        let prediction = predictor(vec![0.1, 0.9]).resolve(&[0.1, 0.9]).unwrap();
        assert_eq!(prediction.index, 1);
        assert_eq!(prediction.label, "Blight");
        assert!((prediction.confidence - 90.0).abs() < 1e-3);
        assert_eq!(format!("{:.2}", prediction.confidence), "90.00");
    }

    #[test]
    fn predict_image_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.png");
        RgbaImage::from_pixel(40, 30, Rgba([30, 140, 40, 255])).save(&path).unwrap();

        let outcome = predictor(vec![0.1, 0.9]).predict_image(&path).unwrap();

        match outcome {
            PredictionOutcome::Predicted(p) => assert_eq!(p.label, "Blight"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_image_is_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = predictor(vec![0.1, 0.9])
            .predict_image(&dir.path().join("1573847-WEB.jpg"))
            .unwrap();
        assert_eq!(outcome, PredictionOutcome::ImageMissing);
    }

    #[test]
    fn width_mismatch_fails_at_load() {
        let labels = LabelMap::from_json(r#"{"Healthy": 0, "Blight": 1}"#).unwrap();
        let res = Predictor::new(Box::new(KeepAll), Box::new(Fixed(vec![0.2, 0.3, 0.5])), labels, 224);
        assert!(matches!(
            res,
            Err(ClassifyError::WidthMismatch { labels: 2, outputs: 3 })
        ));
    }

    #[test]
    fn unknown_class_fails_loudly() {
        // Probe output matches the labels, a later wider output does not.
        let p = predictor(vec![0.5, 0.5]);
        assert!(matches!(
            p.resolve(&[0.1, 0.2, 0.7]),
            Err(ClassifyError::UnknownClass(2))
        ));
    }

    #[test]
    fn load_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut conf = conf::Config::builtin().unwrap().classifier;
        conf.model_path = dir.path().join("plant_disease_model.onnx").to_string_lossy().into_owned();
        conf.class_indices_path = dir.path().join("class_indices.json").to_string_lossy().into_owned();

        assert!(matches!(
            Predictor::load(&conf),
            Err(ClassifyError::Missing { kind: "model", .. })
        ));

        std::fs::write(&conf.model_path, b"").unwrap();
        conf.remove_background = false;
        assert!(matches!(
            Predictor::load(&conf),
            Err(ClassifyError::Missing { kind: "class indices", .. })
        ));
    }
}
