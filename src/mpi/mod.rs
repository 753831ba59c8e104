//! Message passing between the processors that share the distributed x axis
//!
//! The reduction engine only talks to a [`Transport`], which knows
//! the size of the processor group and the own rank, and offers a
//! paired send/receive plus two collectives.
//!
//! Implemented:
//! - [`SerialComm`]: a group of one processor
//! - [`ThreadComm`]: in-process group, one thread per processor, see [`run_group`]
//! - `MpiComm`: mpi communicator (feature `mpi`)
pub mod thread;
#[cfg(feature = "mpi")]
pub mod world;
use crate::error::{Error, Result};
use crate::types::{Cplx, Real};
pub use thread::{run_group, ThreadComm};
#[cfg(feature = "mpi")]
pub use world::{initialize, MpiComm};

/// Tag of a message, identifies the round of a reduction
pub type Tag = u32;

/// Synchronous communication within a fixed group of processors.
///
/// Group membership is fixed for the lifetime of the transport. All
/// processors must call the collectives in the same order, otherwise
/// the group deadlocks or reports a [`Error::Communication`].
pub trait Transport {
    /// Rank of this processor within the group
    fn rank(&self) -> usize;

    /// Number of processors in the group
    fn size(&self) -> usize;

    /// Send `send` to `dest` and receive `recv` from `source` in one step.
    ///
    /// Either side may be `None` (chain ends). The received message
    /// must have length `recv.len()` and carry the same `tag`.
    fn exchange(
        &self,
        tag: Tag,
        dest: Option<usize>,
        send: &[Cplx],
        source: Option<usize>,
        recv: &mut [Cplx],
    ) -> Result<()>;

    /// Elementwise sum over all processors, result on every processor
    fn all_reduce_sum(&self, buf: &mut [Cplx]) -> Result<()>;

    /// Maximum over all processors, result on every processor
    fn all_reduce_max(&self, value: Real) -> Result<Real>;
}

/// Group of a single processor. No messages are ever sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl Transport for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn exchange(
        &self,
        tag: Tag,
        dest: Option<usize>,
        send: &[Cplx],
        source: Option<usize>,
        recv: &mut [Cplx],
    ) -> Result<()> {
        match (dest, source) {
            (None, None) => Ok(()),
            (Some(0), Some(0)) if send.len() == recv.len() => {
                recv.copy_from_slice(send);
                Ok(())
            }
            _ => Err(Error::Communication(format!(
                "serial group cannot exchange message {} with {:?} / {:?}",
                tag, dest, source
            ))),
        }
    }

    fn all_reduce_sum(&self, _buf: &mut [Cplx]) -> Result<()> {
        Ok(())
    }

    fn all_reduce_max(&self, value: Real) -> Result<Real> {
        Ok(value)
    }
}

/// Pack complex values as interleaved real and imaginary parts
#[cfg_attr(not(feature = "mpi"), allow(dead_code))]
pub(crate) fn interleave(data: &[Cplx]) -> Vec<Real> {
    data.iter().flat_map(|z| [z.re, z.im]).collect()
}

/// Inverse of [`interleave`]
#[cfg_attr(not(feature = "mpi"), allow(dead_code))]
pub(crate) fn deinterleave(data: &[Real], out: &mut [Cplx]) {
    for (z, pair) in out.iter_mut().zip(data.chunks_exact(2)) {
        *z = Cplx::new(pair[0], pair[1]);
    }
}
