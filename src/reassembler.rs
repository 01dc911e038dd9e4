//! Drives decoding and the detector passes to a fixed point.

use log::{info, warn};

use crate::code_buffer::CodeBuffer;
use crate::command_buffer::CommandBuffer;
use crate::command_creator::CommandCreator;
use crate::detector::{default_detectors, Detector};

/// Progress of the classification loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Detector passes may still change the classification.
    Decoding,
    /// A full pass reported no change.
    Converged,
}

/// The reassembler: a command buffer plus the detector pipeline.
pub struct Reassembler {
    detectors: Vec<Box<dyn Detector>>,
    commands: CommandBuffer,
    max_passes: usize,
    state: State,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    /// A reassembler with the standard detector pipeline.
    pub fn new() -> Self {
        Reassembler {
            detectors: default_detectors(),
            commands: CommandBuffer::new(Vec::new(), 0),
            max_passes: 10,
            state: State::Decoding,
        }
    }

    /// A reassembler with a custom detector pipeline, e.g. one restored
    /// from a persisted document.
    pub fn with_detectors(detectors: Vec<Box<dyn Detector>>) -> Self {
        Reassembler {
            detectors,
            ..Self::new()
        }
    }

    pub fn detectors(&self) -> &[Box<dyn Detector>] {
        &self.detectors
    }

    pub fn commands(&self) -> &CommandBuffer {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandBuffer {
        &mut self.commands
    }

    /// Replace the command buffer, e.g. when loading persisted state.
    pub fn set_commands(&mut self, commands: CommandBuffer) {
        self.commands = commands;
        self.state = State::Decoding;
    }

    /// Bound on detector passes per run, default 10.
    pub fn set_max_passes(&mut self, max_passes: usize) {
        self.max_passes = max_passes;
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Reassemble the given code from scratch.
    pub fn reassemble(&mut self, code: CodeBuffer) {
        self.commands = CommandBuffer::new(code.code().to_vec(), code.start_address());
        CommandCreator::new(&mut self.commands).create_commands();
        self.run();
    }

    /// Run detector passes over the current buffer until nothing changes or
    /// the pass bound is hit, then decode the final classification.
    pub fn run(&mut self) {
        self.state = State::Decoding;

        let mut change = true;
        let mut count = 0;
        while change && count < self.max_passes {
            info!("iteration {}", count);
            change = self.detect_code_type();
            count += 1;
        }

        if change {
            warn!(
                "classification did not converge within {} passes, accepting the last state",
                self.max_passes
            );
        } else {
            self.state = State::Converged;
        }

        CommandCreator::new(&mut self.commands).create_commands();
    }

    fn detect_code_type(&mut self) -> bool {
        let mut change = false;
        for detector in &self.detectors {
            let detector_hit = detector.detect(&mut self.commands);
            if detector_hit {
                info!("{} changed code types", detector.id());
            }
            change |= detector_hit;
        }
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_type::CodeType;

    #[test]
    fn test_converges_on_plain_code() {
        // LDA #$00, JSR $1005, then the called RTS, then padding
        let code = vec![
            0xA9, 0x00, 0x20, 0x05, 0x10, 0x60, 0x00, 0x00, 0x00, 0x00,
        ];
        let mut reassembler = Reassembler::new();
        reassembler.reassemble(CodeBuffer::new(0x1000, code));

        assert_eq!(reassembler.state(), State::Converged);
        // the call target was promoted to an opcode position
        assert_eq!(reassembler.commands().get_type(5), CodeType::Opcode);
        assert!(reassembler.commands().get_subroutine(0x1005).is_some());
    }

    #[test]
    fn test_empty_code_converges() {
        let mut reassembler = Reassembler::new();
        reassembler.reassemble(CodeBuffer::new(0x1000, Vec::new()));
        assert_eq!(reassembler.state(), State::Converged);
    }
}
