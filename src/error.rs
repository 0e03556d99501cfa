//! Error types for pleat.
//!
//! This module defines all error types used throughout the library.

use std::fmt;

use thiserror::Error;

/// Result type alias using [`ParamError`].
pub type Result<T> = std::result::Result<T, ParamError>;

/// Errors that can occur while building or solving a flattening problem.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    /// The patch has no vertices.
    #[error("patch has no vertices")]
    EmptyMesh,

    /// A triangle references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A triangle has duplicate vertex indices.
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// A 3D triangle could not be rotated into a plane.
    #[error("triangle {triangle} cannot be flattened (out-of-plane deviation {deviation})")]
    Flattening {
        /// The triangle index, or `usize::MAX` when flattening a free-standing triangle.
        triangle: usize,
        /// Largest out-of-plane coordinate after rotation (infinite for collinear points).
        deviation: f64,
    },

    /// A dart sequence has an unusable length.
    #[error("dart of length {len} is invalid (needs an odd length of at least 3)")]
    InvalidDart {
        /// Number of vertices in the rejected sequence.
        len: usize,
    },

    /// A dart has no well-defined symmetry axis in the current layout.
    #[error("dart with tip {tip} has no symmetry axis (tip and endpoints coincide)")]
    DegenerateDart {
        /// Tip vertex of the dart.
        tip: usize,
    },

    /// A dart produced a different number of targets than it has arm vertices.
    #[error("dart with tip {tip} produced {targets} targets for {arms} arm vertices")]
    DartTargetMismatch {
        /// Tip vertex of the dart.
        tip: usize,
        /// Number of targets produced.
        targets: usize,
        /// Number of non-tip vertices.
        arms: usize,
    },

    /// The assembler emitted a different number of equations than predicted.
    #[error("emitted {emitted} equations but {predicted} were predicted")]
    EquationCountMismatch {
        /// Count fixed at construction.
        predicted: usize,
        /// Count actually written (or attempted).
        emitted: usize,
    },

    /// Two inputs that must agree in size do not.
    #[error("dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being compared.
        what: &'static str,
        /// Expected size.
        expected: usize,
        /// Actual size.
        actual: usize,
    },

    /// An operation needed at least one value and got none.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// Factorization of the normal equations failed.
    #[error("factorization failed: {kind}")]
    Factorization {
        /// What went wrong.
        kind: FactorizationFailure,
    },

    /// Solving the factorized system failed.
    #[error("solve failed: {kind}")]
    Solve {
        /// What went wrong.
        kind: SolveFailure,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl ParamError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        ParamError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Returns true for errors that indicate a bug rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ParamError::EquationCountMismatch { .. } | ParamError::DartTargetMismatch { .. }
        )
    }
}

/// Ways the normal-equation factorization can fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FactorizationFailure {
    /// An unknown is touched by no weighted equation (too little anchoring).
    RankDeficient {
        /// Column of the first unconstrained unknown.
        column: usize,
    },
    /// A pivot became non-positive during factorization.
    NotPositiveDefinite,
    /// The normal matrix contains NaN or infinite entries.
    NonFiniteEntry,
}

impl fmt::Display for FactorizationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactorizationFailure::RankDeficient { column } => {
                write!(f, "rank deficient (unknown {column} is unconstrained)")
            }
            FactorizationFailure::NotPositiveDefinite => write!(f, "matrix is not positive definite"),
            FactorizationFailure::NonFiniteEntry => write!(f, "matrix has non-finite entries"),
        }
    }
}

/// Ways the solve step can fail after a successful factorization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolveFailure {
    /// The right-hand side contains NaN or infinite entries.
    InvalidInput,
    /// The solution is non-finite or does not satisfy the system.
    NumericalIssue,
    /// The iterative solver did not reach its tolerance.
    NoConvergence {
        /// Number of iterations attempted.
        iterations: usize,
    },
}

impl fmt::Display for SolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveFailure::InvalidInput => write!(f, "invalid input"),
            SolveFailure::NumericalIssue => write!(f, "numerical issue"),
            SolveFailure::NoConvergence { iterations } => {
                write!(f, "no convergence after {iterations} iterations")
            }
        }
    }
}
