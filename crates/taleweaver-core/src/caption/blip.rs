//! BLIP captioning on ONNX Runtime.
//!
//! The model is exported as two graphs: a vision encoder producing patch
//! embeddings and a text decoder that cross-attends to them. Captions are
//! produced by greedy decoding, one full decoder pass per generated token.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::value::{DynValue, Value};
use tokenizers::Tokenizer;

use crate::error::PipelineError;

/// Decoder start token (`[DEC]`) of the BLIP text decoder.
pub const BOS_TOKEN_ID: i64 = 30522;

/// `[SEP]`, used by BLIP as end-of-sequence.
pub const EOS_TOKEN_ID: i64 = 102;

/// Encoder output plus its shape, detached from the ONNX session.
struct EncoderStates {
    shape: Vec<i64>,
    data: Vec<f32>,
}

/// Vision encoder, text decoder and tokenizer of a BLIP captioning model.
///
/// Sessions sit behind a `Mutex` because `Session::run` requires `&mut self`.
pub struct BlipModel {
    vision: Mutex<Session>,
    decoder: Mutex<Session>,
    decoder_inputs: Vec<String>,
    tokenizer: Tokenizer,
}

impl BlipModel {
    /// Load both ONNX graphs and the tokenizer.
    pub fn load(
        vision_path: &Path,
        decoder_path: &Path,
        tokenizer_path: &Path,
    ) -> Result<Self, PipelineError> {
        for path in [vision_path, decoder_path, tokenizer_path] {
            if !path.exists() {
                return Err(PipelineError::Caption {
                    path: path.to_path_buf(),
                    message: "Model file not found. Run `taleweaver models download` first."
                        .to_string(),
                });
            }
        }

        let vision = load_session(vision_path)?;
        let decoder = load_session(decoder_path)?;
        let decoder_inputs: Vec<String> = decoder
            .inputs()
            .iter()
            .map(|i| i.name().to_string())
            .collect();

        tracing::debug!(
            "Loaded BLIP decoder from {:?} (inputs: {:?})",
            decoder_path,
            decoder_inputs
        );

        let tokenizer =
            Tokenizer::from_file(tokenizer_path).map_err(|e| PipelineError::Caption {
                path: tokenizer_path.to_path_buf(),
                message: format!("Failed to load tokenizer: {e}"),
            })?;

        Ok(Self {
            vision: Mutex::new(vision),
            decoder: Mutex::new(decoder),
            decoder_inputs,
            tokenizer,
        })
    }

    /// Caption a preprocessed image tensor.
    ///
    /// Input shape: \[1, 3, size, size\]. At most `max_new_tokens` tokens are generated.
    pub fn caption(
        &self,
        pixel_values: &Array4<f32>,
        max_new_tokens: u32,
        path: &Path,
    ) -> Result<String, PipelineError> {
        let states = self.encode(pixel_values, path)?;
        let ids = greedy_decode(BOS_TOKEN_ID, EOS_TOKEN_ID, max_new_tokens, |prefix| {
            self.next_token_logits(prefix, &states, path)
        })?;

        let ids: Vec<u32> = ids.iter().map(|&id| id as u32).collect();
        let text = self
            .tokenizer
            .decode(&ids, true)
            .map_err(|e| caption_err(path, format!("Failed to decode tokens: {e}")))?;
        Ok(text.trim().to_string())
    }

    fn encode(
        &self,
        pixel_values: &Array4<f32>,
        path: &Path,
    ) -> Result<EncoderStates, PipelineError> {
        let shape: Vec<i64> = pixel_values.shape().iter().map(|&d| d as i64).collect();
        let flat: Vec<f32> = pixel_values.iter().copied().collect();
        let input = Value::from_array((shape, flat))
            .map_err(|e| caption_err(path, format!("Failed to create pixel tensor: {e}")))?;

        let mut session = self
            .vision
            .lock()
            .map_err(|e| caption_err(path, format!("Session lock poisoned: {e}")))?;
        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "pixel_values".to_string());

        let outputs = session
            .run(ort::inputs![input_name.as_str() => input])
            .map_err(|e| caption_err(path, format!("Vision encoder failed: {e}")))?;

        let hidden = outputs
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| outputs.iter().next())
            .ok_or_else(|| caption_err(path, "Vision encoder produced no output".to_string()))?;

        let (shape, data) = hidden
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| caption_err(path, format!("Failed to extract image embeds: {e}")))?;

        Ok(EncoderStates {
            shape: shape.to_vec(),
            data: data.to_vec(),
        })
    }

    fn next_token_logits(
        &self,
        prefix: &[i64],
        states: &EncoderStates,
        path: &Path,
    ) -> Result<Vec<f32>, PipelineError> {
        let seq_len = prefix.len() as i64;
        let mut inputs: Vec<(String, DynValue)> = Vec::with_capacity(3);

        for name in &self.decoder_inputs {
            let value = if name.contains("input_ids") {
                Value::from_array((vec![1, seq_len], prefix.to_vec())).map(|v| v.into_dyn())
            } else if name.contains("attention_mask") && !name.contains("encoder") {
                Value::from_array((vec![1, seq_len], vec![1i64; prefix.len()]))
                    .map(|v| v.into_dyn())
            } else if name.contains("encoder_hidden_states") {
                Value::from_array((states.shape.clone(), states.data.clone()))
                    .map(|v| v.into_dyn())
            } else if name.contains("encoder_attention_mask") {
                let patches = states.shape.get(1).copied().unwrap_or(1);
                Value::from_array((vec![1, patches], vec![1i64; patches as usize]))
                    .map(|v| v.into_dyn())
            } else {
                return Err(caption_err(
                    path,
                    format!("Unsupported decoder input {name:?}"),
                ));
            };
            let value =
                value.map_err(|e| caption_err(path, format!("Failed to build {name}: {e}")))?;
            inputs.push((name.clone(), value));
        }

        let mut session = self
            .decoder
            .lock()
            .map_err(|e| caption_err(path, format!("Session lock poisoned: {e}")))?;
        let outputs = session
            .run(inputs)
            .map_err(|e| caption_err(path, format!("Text decoder failed: {e}")))?;

        let logits = outputs
            .iter()
            .find(|(name, _)| *name == "logits")
            .or_else(|| outputs.iter().next())
            .ok_or_else(|| caption_err(path, "Text decoder produced no logits".to_string()))?;

        let (shape, data) = logits
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| caption_err(path, format!("Failed to extract logits: {e}")))?;

        // logits are [1, seq, vocab]; keep the last position only.
        if shape.len() != 3 {
            return Err(caption_err(
                path,
                format!("Unexpected logits shape: {:?}", shape),
            ));
        }
        let vocab = shape[2] as usize;
        let start = data.len().saturating_sub(vocab);
        Ok(data[start..].to_vec())
    }
}

fn load_session(path: &Path) -> Result<Session, PipelineError> {
    Session::builder()
        .map_err(|e| caption_err(path, format!("Failed to create ONNX session builder: {e}")))?
        .commit_from_file(path)
        .map_err(|e| caption_err(path, format!("Failed to load ONNX model: {e}")))
}

fn caption_err(path: &Path, message: String) -> PipelineError {
    PipelineError::Caption {
        path: PathBuf::from(path),
        message,
    }
}

/// Greedy decoding loop.
///
/// Starts from `[bos]`, repeatedly asks `step` for next-token logits and appends
/// the argmax until `eos` is produced or `max_new_tokens` tokens were added.
/// Returns only the generated tokens (no `bos`, no `eos`).
pub fn greedy_decode<F>(
    bos: i64,
    eos: i64,
    max_new_tokens: u32,
    mut step: F,
) -> Result<Vec<i64>, PipelineError>
where
    F: FnMut(&[i64]) -> Result<Vec<f32>, PipelineError>,
{
    let mut sequence = vec![bos];
    for _ in 0..max_new_tokens {
        let logits = step(&sequence)?;
        let next = argmax(&logits).ok_or_else(|| PipelineError::Caption {
            path: PathBuf::new(),
            message: "Decoder returned empty logits".to_string(),
        })? as i64;
        if next == eos {
            break;
        }
        sequence.push(next);
    }
    Ok(sequence.split_off(1))
}

fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_hot(vocab: usize, hot: usize) -> Vec<f32> {
        let mut v = vec![0.0; vocab];
        v[hot] = 1.0;
        v
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[f32::NAN, -1.0, -3.0]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_greedy_decode_stops_at_eos() {
        let script = [7usize, 8, 2, 9];
        let mut calls = 0;
        let ids = greedy_decode(0, 2, 20, |prefix| {
            assert_eq!(prefix.len(), calls + 1);
            let next = script[calls];
            calls += 1;
            Ok(one_hot(16, next))
        })
        .unwrap();
        assert_eq!(ids, vec![7, 8]);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_greedy_decode_respects_token_cap() {
        let mut calls = 0;
        let ids = greedy_decode(0, 2, 20, |_| {
            calls += 1;
            Ok(one_hot(16, 5))
        })
        .unwrap();
        assert_eq!(ids.len(), 20);
        assert_eq!(calls, 20);
    }

    #[test]
    fn test_greedy_decode_starts_from_bos() {
        let ids = greedy_decode(BOS_TOKEN_ID, EOS_TOKEN_ID, 3, |prefix| {
            assert_eq!(prefix[0], BOS_TOKEN_ID);
            Ok(one_hot(200, 150))
        })
        .unwrap();
        assert_eq!(ids, vec![150, 150, 150]);
    }

    #[test]
    fn test_greedy_decode_propagates_step_error() {
        let err = greedy_decode(0, 2, 5, |_| {
            Err(PipelineError::Caption {
                path: PathBuf::from("x.jpg"),
                message: "boom".to_string(),
            })
        })
        .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_load_missing_model_files() {
        let dir = tempfile::tempdir().unwrap();
        let result = BlipModel::load(
            &dir.path().join("vision_model.onnx"),
            &dir.path().join("text_decoder.onnx"),
            &dir.path().join("tokenizer.json"),
        );
        match result {
            Err(PipelineError::Caption { message, .. }) => {
                assert!(message.contains("models download"))
            }
            _ => panic!("expected missing model error"),
        }
    }
}
