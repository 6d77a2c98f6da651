//! Controller-visible view of the datapath, rebuilt for every controller step

use crate::acc::Accumulator;
use crate::fifo::WeightFifo;
use crate::host::HostMemory;
use crate::mxu::SystolicArray;
use crate::ub::UnifiedBuffer;

pub struct DataPath<'a> {
    pub host: &'a mut HostMemory,
    pub ub: &'a mut UnifiedBuffer,
    pub fifo: &'a mut WeightFifo,
    pub mxu: &'a mut SystolicArray,
    pub acc: &'a mut Accumulator,
}
