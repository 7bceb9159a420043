use crate::error::{GenerationError, Result};
use async_trait::async_trait;
use debugdojo_common::types::{GeneratedBatch, GeneratedSample};
use rand::Rng;

/// Trait for code generation backends.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Ask the model for a full set of samples.
    async fn generate_batch(&self, prompt: &str) -> Result<GeneratedBatch>;

    /// Ask the model for samples and return the buggy code of one of them,
    /// drawn uniformly at random.
    async fn generate(&self, prompt: &str) -> Result<String> {
        let batch = self.generate_batch(prompt).await?;
        let sample = select_sample(batch.content, &mut rand::thread_rng())
            .ok_or(GenerationError::EmptySampleSet)?;
        Ok(sample.code)
    }
}

/// Uniform draw over the returned samples. No weighting.
pub fn select_sample<R: Rng + ?Sized>(
    mut samples: Vec<GeneratedSample>,
    rng: &mut R,
) -> Option<GeneratedSample> {
    if samples.is_empty() {
        return None;
    }
    let idx = rng.gen_range(0..samples.len());
    Some(samples.swap_remove(idx))
}

/// Parse the model's text answer into the expected JSON shape.
pub fn parse_batch(text: &str) -> Result<GeneratedBatch> {
    Ok(serde_json::from_str(text.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn samples(n: usize) -> Vec<GeneratedSample> {
        (0..n)
            .map(|i| GeneratedSample {
                code: format!("def main():\n    return {}", i),
                fixed_code: format!("def main():\n    return {}", i + 1),
                explanation: format!("off by one in sample {}", i),
            })
            .collect()
    }

    #[test]
    fn test_select_from_empty_set() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(select_sample(Vec::new(), &mut rng).is_none());
    }

    #[test]
    fn test_select_single_sample() {
        let mut rng = StdRng::seed_from_u64(7);
        let picked = select_sample(samples(1), &mut rng).unwrap();
        assert_eq!(picked.code, "def main():\n    return 0");
    }

    #[test]
    fn test_select_covers_every_index() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = HashSet::new();
        for _ in 0..300 {
            let picked = select_sample(samples(3), &mut rng).unwrap();
            seen.insert(picked.code);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_parse_batch() {
        let batch = parse_batch(
            r#"
            {"reasoning": "students forget the base case",
             "content": [{"code": "a", "fixed_code": "b", "explanation": "c"}]}
            "#,
        )
        .unwrap();
        assert_eq!(batch.reasoning, "students forget the base case");
        assert_eq!(batch.content.len(), 1);
    }

    #[test]
    fn test_parse_batch_missing_field() {
        let err = parse_batch(r#"{"reasoning": "r", "content": [{"code": "a"}]}"#).unwrap_err();
        assert!(matches!(err, GenerationError::MalformedJson(_)));
    }

    #[test]
    fn test_parse_batch_not_json() {
        let err = parse_batch("Sure! Here are three buggy programs").unwrap_err();
        assert!(matches!(err, GenerationError::MalformedJson(_)));
    }
}
