//! Transport on top of an mpi communicator
//!
//! Run e.g. with
//!
//! cargo mpirun --np 4 --example solve_laplace_mpi --features mpi --release
use super::{deinterleave, interleave, Tag, Transport};
use crate::error::{Error, Result};
use crate::types::{Cplx, Real};
use mpi::collective::SystemOperation;
use mpi::point_to_point as p2p;
use mpi::traits::{Communicator, CommunicatorCollectives, Destination, Source};
pub use mpi::initialize;

/// Processor group given by an mpi communicator, usually the
/// communicator spanning the processors along x.
pub struct MpiComm<C: Communicator> {
    comm: C,
}

impl<C: Communicator> MpiComm<C> {
    /// Wrap communicator
    pub fn new(comm: C) -> Self {
        Self { comm }
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    fn mpi_rank(&self, rank: usize) -> Result<i32> {
        if rank < self.size() {
            Ok(rank as i32)
        } else {
            Err(Error::Communication(format!(
                "no processor with rank {} in a group of {}",
                rank,
                self.size()
            )))
        }
    }
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
impl<C: Communicator> Transport for MpiComm<C> {
    fn rank(&self) -> usize {
        self.comm.rank() as usize
    }

    fn size(&self) -> usize {
        self.comm.size() as usize
    }

    fn exchange(
        &self,
        tag: Tag,
        dest: Option<usize>,
        send: &[Cplx],
        source: Option<usize>,
        recv: &mut [Cplx],
    ) -> Result<()> {
        let tag = tag as i32;
        let msg = interleave(send);
        let mut buf: Vec<Real> = vec![0.; 2 * recv.len()];
        match (dest, source) {
            (Some(d), Some(s)) => {
                let dest = self.comm.process_at_rank(self.mpi_rank(d)?);
                let source = self.comm.process_at_rank(self.mpi_rank(s)?);
                p2p::send_receive_into_with_tags(&msg[..], &dest, tag, &mut buf[..], &source, tag);
            }
            (Some(d), None) => {
                self.comm
                    .process_at_rank(self.mpi_rank(d)?)
                    .send_with_tag(&msg[..], tag);
            }
            (None, Some(s)) => {
                self.comm
                    .process_at_rank(self.mpi_rank(s)?)
                    .receive_into_with_tag(&mut buf[..], tag);
            }
            (None, None) => return Ok(()),
        }
        if source.is_some() {
            deinterleave(&buf, recv);
        }
        Ok(())
    }

    fn all_reduce_sum(&self, buf: &mut [Cplx]) -> Result<()> {
        let local = interleave(buf);
        let mut global: Vec<Real> = vec![0.; local.len()];
        self.comm
            .all_reduce_into(&local[..], &mut global[..], SystemOperation::sum());
        deinterleave(&global, buf);
        Ok(())
    }

    fn all_reduce_max(&self, value: Real) -> Result<Real> {
        let mut global: Real = 0.;
        self.comm
            .all_reduce_into(&value, &mut global, SystemOperation::max());
        Ok(global)
    }
}
