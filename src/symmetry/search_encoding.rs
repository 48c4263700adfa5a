//! Flat generator layout read by the search component
//!
//! A generator is an array over `num_vars + sum(ranges)` indices. Index `v <
//! num_vars` holds the image of variable `v`; the facts of variable `v`
//! follow at `var_to_start_index[v] + val`. `-1` marks an undefined entry,
//! which is expected for none-of-those values.

use std::io::Write;

use tracing::warn;

use super::SasGenerator;
use crate::error::Result;
use crate::task::Fact;

/// Diagnostics of the encoding
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodingCounts {
    /// Generators dropped because they split a variable across variables
    pub inconsistent: usize,
    /// Encoded generators with at least one undefined entry
    pub with_undefined_entries: usize,
}

/// Generators in the search representation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchGenerators {
    var_by_shifted_index: Vec<usize>,
    var_to_start_index: Vec<usize>,
    generators: Vec<Vec<i64>>,
}

impl SearchGenerators {
    /// Encodes `generators` for variables with the given ranges
    pub fn encode(ranges: &[usize], generators: &[SasGenerator]) -> (Self, EncodingCounts) {
        let num_vars = ranges.len();
        let mut var_to_start_index = Vec::with_capacity(num_vars);
        let mut var_by_shifted_index = Vec::new();
        let mut num_indices = num_vars;
        for (var, &range) in ranges.iter().enumerate() {
            var_to_start_index.push(num_indices);
            num_indices += range;
            var_by_shifted_index.extend(std::iter::repeat(var).take(range));
        }

        let mut layout = Self {
            var_by_shifted_index,
            var_to_start_index,
            generators: Vec::with_capacity(generators.len()),
        };
        let mut counts = EncodingCounts::default();
        'generators: for generator in generators {
            let mut encoded = vec![-1i64; num_indices];
            for (from, to) in generator.iter() {
                let (Some(from_index), Some(to_index)) = (layout.checked_index(from), layout.checked_index(to)) else {
                    continue;
                };
                encoded[from_index] = to_index as i64;
                let (from_var, to_var) = (from.0, to.0);
                match encoded[from_var] {
                    -1 => encoded[from_var] = to_var as i64,
                    image if image == to_var as i64 => {}
                    image => {
                        warn!(from_var, image, to_var, "generator maps a variable to two variables");
                        counts.inconsistent += 1;
                        continue 'generators;
                    }
                }
            }
            if encoded.contains(&-1) {
                counts.with_undefined_entries += 1;
            }
            layout.generators.push(encoded);
        }
        (layout, counts)
    }

    fn checked_index(&self, (var, val): Fact) -> Option<usize> {
        let start = *self.var_to_start_index.get(var)?;
        let end = self
            .var_to_start_index
            .get(var + 1)
            .copied()
            .unwrap_or(self.num_variables() + self.var_by_shifted_index.len());
        (start + val < end).then_some(start + val)
    }

    /// Returns the index of a fact
    ///
    /// # Panics
    /// Panics if `var` does not exist.
    pub fn index_of(&self, (var, val): Fact) -> usize {
        self.var_to_start_index[var] + val
    }

    /// Returns the fact at a shifted index, or `None` for variable indices
    pub fn fact_at(&self, index: usize) -> Option<Fact> {
        let var = *self.var_by_shifted_index.get(index.checked_sub(self.num_variables())?)?;
        Some((var, index - self.var_to_start_index[var]))
    }

    /// Returns the number of variables
    pub fn num_variables(&self) -> usize {
        self.var_to_start_index.len()
    }

    /// Returns the length of every encoded generator
    pub fn num_indices(&self) -> usize {
        self.num_variables() + self.var_by_shifted_index.len()
    }

    /// Returns the variable of every fact index, shifted by the number of
    /// variables
    pub fn var_by_shifted_index(&self) -> &[usize] {
        &self.var_by_shifted_index
    }

    /// Returns the index of the first fact of every variable
    pub fn var_to_start_index(&self) -> &[usize] {
        &self.var_to_start_index
    }

    /// Returns the encoded generators
    pub fn generators(&self) -> &[Vec<i64>] {
        &self.generators
    }

    /// Returns the number of encoded generators
    pub fn len(&self) -> usize {
        self.generators.len()
    }

    /// Returns true if no generator was encoded
    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Writes the `begin_symmetries` block
    ///
    /// # Errors
    /// Returns `Io` if writing fails.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "begin_symmetries")?;
        writeln!(out, "{} {}", self.generators.len(), self.num_indices())?;
        for generator in &self.generators {
            let line: Vec<String> = generator.iter().map(i64::to_string).collect();
            writeln!(out, "{}", line.join(" "))?;
        }
        writeln!(out, "end_symmetries")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_indices() {
        let (layout, _) = SearchGenerators::encode(&[3, 2], &[]);
        assert_eq!(layout.num_indices(), 7);
        assert_eq!(layout.var_to_start_index(), &[2, 5]);
        assert_eq!(layout.var_by_shifted_index(), &[0, 0, 0, 1, 1]);
        assert_eq!(layout.index_of((1, 1)), 6);
        assert_eq!(layout.fact_at(6), Some((1, 1)));
        assert_eq!(layout.fact_at(1), None);
        assert!(layout.is_empty());
    }

    #[test]
    fn encodes_variable_swap() {
        let generator: SasGenerator = [((0, 0), (1, 0)), ((1, 0), (0, 0))].into_iter().collect();
        let (layout, counts) = SearchGenerators::encode(&[2, 2], &[generator]);
        // vars, var0 values, var1 values; none-of-those stays undefined
        assert_eq!(layout.generators()[0], vec![1, 0, 4, -1, 2, -1]);
        assert_eq!(counts.with_undefined_entries, 1);
        assert_eq!(counts.inconsistent, 0);
    }

    #[test]
    fn split_variable_is_inconsistent() {
        let generator: SasGenerator = [
            ((0, 0), (1, 0)),
            ((0, 1), (2, 0)),
            ((1, 0), (0, 0)),
            ((2, 0), (0, 1)),
        ]
        .into_iter()
        .collect();
        let (layout, counts) = SearchGenerators::encode(&[3, 2, 2], &[generator]);
        assert!(layout.is_empty());
        assert_eq!(counts.inconsistent, 1);
    }

    #[test]
    fn writes_symmetries_block() {
        let generator: SasGenerator = [((0, 0), (0, 1)), ((0, 1), (0, 0))].into_iter().collect();
        let (layout, _) = SearchGenerators::encode(&[3], &[generator]);
        let mut out = Vec::new();
        layout.write_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "begin_symmetries\n1 4\n0 2 1 -1\nend_symmetries\n"
        );
    }
}
