//! Hard-decision Viterbi decoder for the FICH convolutional code
//!
//! Register-exchange variant: every trellis state carries its survivor path
//! in a bit register, so the decoder runs forward once and reads the result
//! straight out of the final state, with no traceback pass. The codeword is
//! short enough (44 steps) for the paths to fit in a u64.

use super::convenc::ConvEncState;

const CONSTRAINT: usize = 5;
const STATES: usize = 1 << (CONSTRAINT - 1);

/// Expected output pair per (state, input), derived from the encoder itself
/// so the two sides cannot drift apart.
fn branch_table() -> [[(u8, u8); 2]; STATES] {
    let mut table = [[(0u8, 0u8); 2]; STATES];
    for (state, entry) in table.iter_mut().enumerate() {
        for input in 0..2u8 {
            let mut out = [0u8; 2];
            ConvEncState::from_state(state as u8).encode(&[input], &mut out);
            entry[input as usize] = (out[0], out[1]);
        }
    }
    table
}

/// Decode `received.len() / 2` message bits from a stream of hard bit pairs
/// (one bit per byte). The encoder starts in state 0 and the tail bits park
/// it back there.
/// Panics if `output` is too short or the message outgrows the path registers.
pub fn decode(received: &[u8], output: &mut [u8]) {
    let steps = received.len() / 2;
    assert!(steps <= u64::BITS as usize);
    assert!(output.len() >= steps);

    let branches = branch_table();

    // Path metric and survivor bits per state. Unreached states start half
    // way to the ceiling: never picked, still room to accumulate.
    let mut metric = [u32::MAX / 2; STATES];
    let mut path = [0u64; STATES];
    metric[0] = 0;

    for step in 0..steps {
        let r1 = received[step * 2] & 1;
        let r2 = received[step * 2 + 1] & 1;

        let mut next_metric = [u32::MAX; STATES];
        let mut next_path = [0u64; STATES];

        for next in 0..STATES {
            // the freshly shifted-in bit is the low bit of the new state;
            // both predecessors share the new state's upper bits
            let input = next & 1;
            for high in 0..2usize {
                let prev = (next >> 1) | (high << 3);
                let (g1, g2) = branches[prev][input];
                let cost = metric[prev] + u32::from(g1 ^ r1) + u32::from(g2 ^ r2);
                if cost < next_metric[next] {
                    next_metric[next] = cost;
                    next_path[next] = (path[prev] << 1) | input as u64;
                }
            }
        }

        metric = next_metric;
        path = next_path;
    }

    // the survivor of state 0 is the message, first bit on top
    let survivor = path[0];
    for (i, bit) in output.iter_mut().take(steps).enumerate() {
        *bit = ((survivor >> (steps - 1 - i)) & 1) as u8;
    }
}
