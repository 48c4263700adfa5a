//! # sas-symmetry
//!
//! Symmetry-aware translation of grounded STRIPS planning tasks into
//! finite-domain (SAS+) tasks.
//!
//! The translator turns propositional facts, operators with conditional
//! effects, axioms and a goal into one finite-domain variable per fact group.
//! Alongside, it builds a colored structure graph of the lifted task, asks an
//! automorphism oracle for the generators of its symmetry group, grounds them
//! into permutations of finite-domain facts and keeps them valid through every
//! simplification of the finite-domain model.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sas_symmetry::engine::RefinementOracle;
//! use sas_symmetry::pipeline::{SymmetryTranslator, TranslateOptions};
//! use sas_symmetry::simplify::KeepOrder;
//!
//! let options = TranslateOptions { compute_symmetries: true, ..Default::default() };
//! let translator = SymmetryTranslator::new(options);
//! let mut oracle = RefinementOracle::new();
//! let translation = translator.translate(&lifted, &ground, &grouping, &mut oracle, &KeepOrder)?;
//!
//! let mut out = Vec::new();
//! translation.task.write_to(&mut out)?;
//! println!("{} generators", translation.statistics.remaining_generators());
//! ```

#![warn(missing_docs)]
#![warn(rust_2024_compatibility)]

/// Planning task data model (atoms, literals, lifted and grounded tasks)
pub mod task;

/// Colored structure graph of the lifted task
pub mod graph;

/// Automorphism oracle interface and the reference refinement search
pub mod engine;

/// STRIPS to finite-domain translation of conditions, operators and axioms
pub mod translator;

/// Finite-domain task representation and `output.sas` writer
pub mod sas;

/// Simplifications of the finite-domain task (unreachable facts, variable order)
pub mod simplify;

/// Lifted and grounded symmetry generators
pub mod symmetry;

/// End-to-end translation pipeline
pub mod pipeline;

/// Error types
pub mod error {
    //! Error types for sas-symmetry

    use thiserror::Error;

    /// Errors that abort a translation
    ///
    /// Unsatisfiable conditions and invalid generators are not errors: the
    /// former are signalled with `None`, the latter are dropped and counted.
    #[derive(Error, Debug)]
    pub enum TranslateError {
        /// An atom maps to an unexpected number of finite-domain facts
        #[error("encoding policy violated: {0}")]
        EncodingPolicy(String),

        /// Two initial facts assign different values to the same variable
        #[error("inconsistent init facts: {0}")]
        InconsistentInit(String),

        /// The goal translates into a disjunction
        #[error("negative goal not supported: {0}")]
        UnsupportedNegativeGoal(String),

        /// A grounded generator does not permute the facts it maps
        #[error("grounded generator is not a permutation")]
        NotAPermutation,

        /// Malformed input
        #[error("invalid argument: {0}")]
        InvalidArgument(String),

        /// Writing the output failed
        #[error("output error: {0}")]
        Io(#[from] std::io::Error),
    }

    /// Result type for sas-symmetry operations
    pub type Result<T> = std::result::Result<T, TranslateError>;
}

// Re-export commonly used types
pub use error::{Result, TranslateError};
pub use pipeline::{Statistics, SymmetryTranslator, TranslateOptions, Translation};
pub use task::{Atom, Fact, Literal};
