//! Provide Image Classification
//!
pub mod onnx {
    use ndarray::{Array4, CowArray};
    use ort::{
        environment::Environment, value::Value, ExecutionProvider, GraphOptimizationLevel,
        LoggingLevel, Session, SessionBuilder,
    };

    use super::Classifier;
    use crate::module::error::VisionError;

    /// Build a CPU session for the model at `model_path`.
    ///
    pub fn session(name: &str, model_path: &str, intra_threads: i16) -> Result<Session, VisionError> {
        let environment = Environment::builder()
            .with_name(name)
            .with_log_level(LoggingLevel::Warning)
            .with_execution_providers([ExecutionProvider::CPU(Default::default())])
            .build()?
            .into_arc();
        let session = SessionBuilder::new(&environment)?
            .with_optimization_level(GraphOptimizationLevel::Level1)?
            .with_intra_threads(intra_threads)?
            .with_model_from_file(model_path)?;
        log::info!("Loaded {} from {}", name, model_path);
        Ok(session)
    }

    /// Classifier exported to ONNX. Input `(1, H, W, 3)`, output `(1, classes)` softmax.
    ///
    pub struct OnnxClassifier {
        session: Session,
    }

    impl OnnxClassifier {
        pub fn new(model_path: &str, intra_threads: i16) -> Result<Self, VisionError> {
            Ok(Self {
                session: session("classifier", model_path, intra_threads)?,
            })
        }
    }

    impl Classifier for OnnxClassifier {
        fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, VisionError> {
            let array = CowArray::from(input.view().into_dyn());
            let tensor = vec![Value::from_array(self.session.allocator(), &array)?];

            let outs = self.session.run(tensor)?;
            let out = outs.get(0).ok_or(VisionError::EmptyOutput)?.try_extract::<f32>()?;
            let view = out.view();
            match view.shape() {
                [1, _] => Ok(view.iter().copied().collect()),
                shape => Err(VisionError::OutputShape(shape.to_vec())),
            }
        }
    }
}

use ndarray::Array4;

use crate::module::error::VisionError;

/// A model mapping one preprocessed batch to class probabilities.
pub trait Classifier {
    /// Probabilities for the single image in `input`, one per class.
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, VisionError>;
}

/// Index and value of the highest probability. Ties keep the lowest index.
pub fn top(probabilities: &[f32]) -> Result<(usize, f32), VisionError> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &prob) in probabilities.iter().enumerate() {
        if prob.is_nan() {
            return Err(VisionError::NotANumber(index));
        }
        match best {
            Some((_, b)) if prob <= b => (),
            _ => best = Some((index, prob)),
        }
    }
    best.ok_or(VisionError::EmptyOutput)
}

/// Classification result
///
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub index: usize,
    pub label: String,
    pub confidence: f32, // percent, [0, 100]
}
