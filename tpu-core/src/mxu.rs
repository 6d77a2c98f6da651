//! 16x16 systolic matrix unit: int8 operand tiles, int32 result tile

use crate::port::LatencyPort;

pub const TILE_DIM: usize = 16;
pub const TILE_BYTES: usize = TILE_DIM * TILE_DIM;
pub const RESULT_BYTES: usize = TILE_BYTES * 4;

// Fixed pass latency regardless of operand data
const EXECUTE_LATENCY: u32 = 32;

#[derive(Debug, Clone)]
pub struct SystolicArray {
    port: LatencyPort,
    input_tile: Vec<u8>,
    weight_tile: Vec<u8>,
    result: Vec<u8>,
}

impl SystolicArray {
    pub fn new() -> Self {
        Self {
            port: LatencyPort::new(),
            input_tile: Vec::new(),
            weight_tile: Vec::new(),
            result: Vec::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.port.is_idle()
    }

    /// Latches both operand tiles and starts the fixed 32-cycle pass.
    pub fn execute_request(&mut self, inputs: &[u8], weights: &[u8]) -> bool {
        if !self.port.try_begin(EXECUTE_LATENCY) {
            return false;
        }

        log::trace!("MXU execute: {} input bytes, {} weight bytes", inputs.len(), weights.len());
        self.input_tile = inputs.to_vec();
        self.weight_tile = weights.to_vec();
        true
    }

    pub fn tick(&mut self) {
        if self.port.tick() {
            self.result = multiply(&self.input_tile, &self.weight_tile);
        }
    }

    /// Result of the most recently completed pass: 256 little-endian i32s,
    /// or empty if the operands were not exactly one tile each.
    pub fn result(&self) -> &[u8] {
        &self.result
    }
}

/// Row-major dense matmul `C[i][j] = sum_k A[i][k] * B[k][j]` with
/// sign-extended i8 operands accumulated into i32.
///
/// Operands of any size other than one full tile produce an empty result.
pub fn multiply(inputs: &[u8], weights: &[u8]) -> Vec<u8> {
    if inputs.len() != TILE_BYTES || weights.len() != TILE_BYTES {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(RESULT_BYTES);
    for i in 0..TILE_DIM {
        for j in 0..TILE_DIM {
            let mut sum: i32 = 0;
            for k in 0..TILE_DIM {
                let a = inputs[i * TILE_DIM + k] as i8;
                let b = weights[k * TILE_DIM + j] as i8;
                sum += i32::from(a) * i32::from(b);
            }
            result.extend_from_slice(&sum.to_le_bytes());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_tile() -> Vec<u8> {
        let mut tile = vec![0; TILE_BYTES];
        for i in 0..TILE_DIM {
            tile[i * TILE_DIM + i] = 1;
        }
        tile
    }

    fn result_element(result: &[u8], row: usize, col: usize) -> i32 {
        let offset = (row * TILE_DIM + col) * 4;
        i32::from_le_bytes(result[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn identity_times_random_tile() {
        for _ in 0..20 {
            let tile: Vec<u8> = (0..TILE_BYTES).map(|_| rand::random()).collect();
            let result = multiply(&identity_tile(), &tile);

            assert_eq!(result.len(), RESULT_BYTES);
            for row in 0..TILE_DIM {
                for col in 0..TILE_DIM {
                    let expected = i32::from(tile[row * TILE_DIM + col] as i8);
                    assert_eq!(result_element(&result, row, col), expected);
                }
            }
        }
    }

    #[test]
    fn single_product_lands_at_origin() {
        let mut inputs = vec![0; TILE_BYTES];
        let mut weights = vec![0; TILE_BYTES];
        inputs[0] = 3;
        weights[0] = 5;

        let result = multiply(&inputs, &weights);
        assert_eq!(result_element(&result, 0, 0), 15);
        for idx in 1..TILE_BYTES {
            assert_eq!(result_element(&result, idx / TILE_DIM, idx % TILE_DIM), 0);
        }
    }

    #[test]
    fn operands_are_sign_extended() {
        let mut inputs = vec![0; TILE_BYTES];
        let mut weights = vec![0; TILE_BYTES];

        // -128 * -128 accumulated across all 16 k positions
        for k in 0..TILE_DIM {
            inputs[k] = 0x80;
            weights[k * TILE_DIM] = 0x80;
        }

        let result = multiply(&inputs, &weights);
        assert_eq!(result_element(&result, 0, 0), 128 * 128 * 16);
    }

    #[test]
    fn degenerate_operands_produce_empty_result() {
        assert!(multiply(&[], &[]).is_empty());
        assert!(multiply(&[0; TILE_BYTES], &[0; 255]).is_empty());
        assert!(multiply(&[0; 4], &[0; TILE_BYTES]).is_empty());
        assert!(multiply(&[0; TILE_BYTES + 1], &[0; TILE_BYTES]).is_empty());
    }

    #[test]
    fn pass_completes_after_fixed_latency() {
        let mut mxu = SystolicArray::new();

        let mut weights = vec![0; TILE_BYTES];
        weights[0] = 9;
        assert!(mxu.execute_request(&identity_tile(), &weights));
        assert!(!mxu.is_idle());

        // A second request is rejected while the pass is in flight
        assert!(!mxu.execute_request(&identity_tile(), &weights));

        for _ in 0..31 {
            mxu.tick();
            assert!(!mxu.is_idle());
        }
        mxu.tick();
        assert!(mxu.is_idle());
        assert_eq!(result_element(mxu.result(), 0, 0), 9);
    }
}
