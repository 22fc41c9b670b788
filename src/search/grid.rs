use crate::error::{EnsembleError, Result};
use crate::WeightVector;

/// Integer points summing to `total`. The first component descends from
/// `start`, the last is the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimplexGrid {
    components: usize,
    total: u32,
    step: u32,
    start: u32,
}

impl SimplexGrid {
    pub fn new(components: usize, total: u32, step: u32, start: u32) -> Result<Self> {
        if components == 0 {
            return Err(EnsembleError::config("grid needs at least one component"));
        }
        if step == 0 {
            return Err(EnsembleError::config("grid step must be positive"));
        }
        Ok(Self {
            components,
            total,
            step,
            start,
        })
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn points(&self) -> SimplexPoints {
        let free_len = self.components - 1;
        let free = if free_len == 0 {
            Some(Vec::new())
        } else {
            self.first_component().map(|first| {
                let mut free = vec![0; free_len];
                free[0] = first;
                free
            })
        };
        SimplexPoints {
            total: self.total,
            step: self.step,
            free,
        }
    }

    pub fn weights(&self) -> impl Iterator<Item = WeightVector> {
        self.points().map(|units| WeightVector::from_units(&units))
    }

    fn first_component(&self) -> Option<u32> {
        if self.start <= self.total {
            return Some(self.start);
        }
        let excess = self.start - self.total;
        let steps_down = excess.div_ceil(self.step);
        self.start.checked_sub(steps_down.checked_mul(self.step)?)
    }
}

#[derive(Debug, Clone)]
pub struct SimplexPoints {
    total: u32,
    step: u32,
    free: Option<Vec<u32>>,
}

impl SimplexPoints {
    fn advance(&self, free: &[u32]) -> Option<Vec<u32>> {
        let mut next = free.to_vec();
        for idx in (1..next.len()).rev() {
            let used: u32 = next[..idx].iter().sum();
            let budget = self.total - used;
            if next[idx] + self.step <= budget {
                next[idx] += self.step;
                next[idx + 1..].iter_mut().for_each(|value| *value = 0);
                return Some(next);
            }
        }
        match next.first_mut() {
            Some(first) if *first >= self.step => {
                *first -= self.step;
                next[1..].iter_mut().for_each(|value| *value = 0);
                Some(next)
            }
            _ => None,
        }
    }
}

impl Iterator for SimplexPoints {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        let free = self.free.take()?;
        self.free = self.advance(&free);

        let remainder = self.total - free.iter().sum::<u32>();
        let mut point = free;
        point.push(remainder);
        Some(point)
    }
}
