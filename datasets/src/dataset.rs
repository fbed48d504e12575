//! In-memory dataset with epoch wraparound

use inferbench_core::{Example, ExampleSource, SourceError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Fixed collection of examples served in order, wrapping around at the end
///
/// When a batch would run past the last example, the epoch counter
/// increments, the examples are reshuffled if a shuffle policy is set,
/// and the batch is served from the start. Without a shuffle policy the
/// order never changes.
#[derive(Debug)]
pub struct Dataset {
    name: String,
    examples: Vec<Example>,
    cursor: usize,
    epochs_completed: usize,
    rng: Option<StdRng>,
}

impl Dataset {
    /// Create a dataset over `examples` in the given order
    pub fn new(name: impl Into<String>, examples: Vec<Example>) -> Self {
        Self {
            name: name.into(),
            examples,
            cursor: 0,
            epochs_completed: 0,
            rng: None,
        }
    }

    /// Reshuffle on every wraparound, seeded from `seed` or from entropy
    pub fn with_shuffle(mut self, seed: Option<u64>) -> Self {
        self.rng = Some(match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        });
        self
    }

    /// Examples in their current order
    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    /// Position of the next example within the current epoch
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl ExampleSource for Dataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.examples.len()
    }

    fn epochs_completed(&self) -> usize {
        self.epochs_completed
    }

    fn next_batch(&mut self, n: usize) -> Result<&[Example], SourceError> {
        let available = self.examples.len();
        if available == 0 {
            return Err(SourceError::Empty);
        }
        if n > available {
            return Err(SourceError::BatchTooLarge {
                requested: n,
                available,
            });
        }

        if self.cursor + n > available {
            self.epochs_completed += 1;
            if let Some(rng) = self.rng.as_mut() {
                self.examples.shuffle(rng);
            }
            self.cursor = 0;
            tracing::debug!(
                dataset = %self.name,
                epochs_completed = self.epochs_completed,
                "Dataset wrapped around"
            );
        }

        let start = self.cursor;
        self.cursor += n;
        Ok(&self.examples[start..self.cursor])
    }
}
