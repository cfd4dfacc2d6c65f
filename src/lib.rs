//! Gfpcore is a Rust library for arithmetic over prime fields and over
//! elliptic curves defined on prime fields.
//!
//! The library is organized in layers:
//!
//!  - `backend`: selection of the machine word type (32-bit or 64-bit)
//!    and the carrying primitives on words.
//!
//!  - `mp`: multi-precision arithmetic over caller-provided word
//!    buffers: additions, subtractions, schoolbook, Comba and Karatsuba
//!    multiplications and squarings, the dispatcher that chooses between
//!    them, and Montgomery reduction.
//!
//!  - `bigint`: a signed, heap-allocated big integer type (`BigInt`) on
//!    top of `mp`, with division, shifts, byte encoding and decoding.
//!
//!  - `gfp`: elements of GF(p) for a runtime prime `p` (`GFpElement`),
//!    which may switch lazily to the Montgomery representation so that
//!    chains of multiplications avoid full reductions. The prime and its
//!    derived Montgomery constants are held in a shared, immutable
//!    descriptor (`PrimeModulus`).
//!
//!  - `curve` and `point`: short Weierstrass curves `y^2 = x^3 + a*x + b`
//!    over GF(p) (`CurveGFp`), and points in Jacobian coordinates
//!    (`PointGFp`) with addition, doubling, scalar multiplication and the
//!    standard compressed, uncompressed and hybrid encodings.
//!
//!  - `curves`: parameters of some standard named curves.
//!
//! # Usage
//!
//! The library is `no_std` but requires `alloc`: big integers and field
//! elements have runtime-dependent sizes. By default, it compiles
//! against the standard library (the `std` feature), which only adds the
//! `std::error::Error` implementation on the error type.
//!
//! # Conventions
//!
//! Word-level and field operations are constant-time unless explicitly
//! documented otherwise; non-constant-time functions normally have
//! "vartime" in their name. Functions that return or use a potentially
//! secret Boolean value use a `Word` mask; all-ones means "true", and
//! zero means "false".
//!
//! Functions that modify the object on which they are called tend to
//! have a name in `set_*()`; the corresponding name without the prefix
//! leaves the object unmodified and returns a new instance. Fallible
//! operations return a `Result` with this crate's `Error` type. The
//! usual arithmetic operators are also implemented for convenience;
//! they panic where the corresponding method would return an error
//! (e.g. a division by zero).

#![no_std]

#[cfg_attr(not(feature = "std"), macro_use)]
extern crate alloc;

#[cfg(feature = "std")]
#[macro_use]
extern crate std;

pub(crate) use alloc::vec::Vec;

pub use rand_core::{CryptoRng, RngCore};

pub mod backend;
pub mod error;
pub mod mp;
pub mod bigint;
pub mod gfp;
pub mod curve;
pub mod point;
pub mod curves;

pub use backend::Word;
pub use error::{Error, Result};
pub use bigint::{BigInt, Sign};
pub use gfp::{GFpElement, PrimeModulus, ModulusHandle, fe2osp, os2fep};
pub use curve::CurveGFp;
pub use point::{PointGFp, PointFormat, encode_point, decode_point};
pub use curves::NamedCurve;
