//! Text embedding backends for the semantic index.

use crate::error::MemoryError;
use async_trait::async_trait;

/// Turns text into vectors comparable by dot product.
///
/// Implementations return one L2-normalised vector per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, MemoryError>;

    /// Identifier used in logs.
    fn name(&self) -> &str;
}

/// Scale `vector` to unit length in place; zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Offline embedder based on feature hashing.
///
/// Each lowercase word and each character bigram inside a word is hashed
/// (FNV-1a) into one of `dimensions` buckets. Texts sharing vocabulary land
/// close together, which is enough to rank a small personal memory.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
        {
            vector[self.bucket(word.as_bytes())] += 1.0;
            let chars: Vec<char> = word.chars().collect();
            for pair in chars.windows(2) {
                let bigram: String = pair.iter().collect();
                vector[self.bucket(bigram.as_bytes())] += 0.5;
            }
        }
        normalize(&mut vector);
        vector
    }

    fn bucket(&self, bytes: &[u8]) -> usize {
        (fnv1a(bytes) % self.dimensions as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, MemoryError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

#[cfg(feature = "fastembed")]
mod local {
    use super::{Embedder, normalize};
    use crate::error::MemoryError;
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use log::info;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Sentence embeddings from a local all-MiniLM-L6-v2 model.
    pub struct FastEmbedder {
        model: Arc<Mutex<TextEmbedding>>,
    }

    impl FastEmbedder {
        /// Load the model, downloading it on first use.
        pub fn new() -> Result<Self, MemoryError> {
            let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
                .map_err(|err| MemoryError::Embedding(err.to_string()))?;
            info!("loaded local embedding model (model=AllMiniLML6V2)");
            Ok(Self {
                model: Arc::new(Mutex::new(model)),
            })
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedder {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, MemoryError> {
            let model = self.model.clone();
            let mut vectors = tokio::task::spawn_blocking(move || model.lock().embed(texts, None))
                .await
                .map_err(|err| MemoryError::Embedding(err.to_string()))?
                .map_err(|err| MemoryError::Embedding(err.to_string()))?;
            for vector in &mut vectors {
                normalize(vector);
            }
            Ok(vectors)
        }

        fn name(&self) -> &str {
            "fastembed"
        }
    }
}

#[cfg(feature = "fastembed")]
pub use local::FastEmbedder;

#[cfg(test)]
mod tests {
    use super::{Embedder, HashingEmbedder, dot_product, normalize};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn hashing_embedder_is_deterministic_and_normalised() {
        let embedder = HashingEmbedder::new(64);
        let first = embedder
            .embed(vec!["favorite food: ramen".to_string()])
            .await
            .expect("embed");
        let second = embedder
            .embed(vec!["favorite food: ramen".to_string()])
            .await
            .expect("embed");
        assert_eq!(first, second);
        assert_eq!(first[0].len(), 64);
        let norm = dot_product(&first[0], &first[0]);
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::default();
        let vectors = embedder
            .embed(vec![
                "what is my name".to_string(),
                "name: Alice".to_string(),
                "hobby: climbing".to_string(),
            ])
            .await
            .expect("embed");
        let related = dot_product(&vectors[0], &vectors[1]);
        let unrelated = dot_product(&vectors[0], &vectors[2]);
        assert!(related > unrelated);
    }

    #[test]
    fn normalize_leaves_zero_vector_alone() {
        let mut zero = vec![0.0f32; 4];
        normalize(&mut zero);
        assert_eq!(zero, vec![0.0f32; 4]);
    }
}
