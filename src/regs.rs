//! Register map and register-level programming.
//!
//! The engine's registers are reached through a [`Bus`], which on the target
//! is [`Mmio`] and in host tests is [`crate::mock::MockBus`].
//!
//! Every field gets its own 32-bit word. Input layers are identical blocks
//! laid out at a fixed stride, so all four are programmed by the same code
//! with the block base computed from the layer index. The two engine
//! generations differ only in where the blocks sit (see [`Generation`]).

use crate::engine::Generation;
use crate::layer::{
    Handshake, InputLayer, LayerSet, PixelSource, Polarity, ResultLayer,
};

/// 32-bit register access at absolute bus addresses.
pub trait Bus {
    fn read(&self, addr: u32) -> u32;
    fn write(&mut self, addr: u32, value: u32);

    fn modify(&mut self, addr: u32, f: impl FnOnce(u32) -> u32) {
        let v = self.read(addr);
        self.write(addr, f(v));
    }
}

/// Volatile access to the real memory-mapped registers.
#[derive(Debug)]
pub struct Mmio(());

impl Mmio {
    /// # Safety
    ///
    /// There must be at most one `Mmio` driving a given engine at a time,
    /// and the code must be running on the SoC that has it.
    pub unsafe fn steal() -> Self {
        Mmio(())
    }
}

impl Bus for Mmio {
    fn read(&self, addr: u32) -> u32 {
        // Safety: by the contract of `steal`, addr is a device register.
        unsafe { core::ptr::read_volatile(addr as usize as *const u32) }
    }

    fn write(&mut self, addr: u32, value: u32) {
        // Safety: by the contract of `steal`, addr is a device register.
        unsafe { core::ptr::write_volatile(addr as usize as *mut u32, value) }
    }
}

/// Global control block offsets.
pub mod glb {
    /// Writing `RUN` starts the engine.
    pub const CTRL: u32 = 0x00;
    pub const CTRL_RUN: u32 = 1 << 0;
    /// `RUN_STATE` is set from start until the last result pixel is written.
    pub const STATUS: u32 = 0x04;
    pub const STATUS_RUN_STATE: u32 = 1 << 0;
    /// Bit 0 enables the result layer, bit n enables input n.
    pub const LAYER_EN: u32 = 0x08;
    pub const RELOAD: u32 = 0x0C;
    pub const RELOAD_AUTO: u32 = 1 << 0;
    pub const RELOAD_LLI: u32 = 1 << 1;
    /// Next linked-list item.
    pub const LLP: u32 = 0x10;
    pub const INT_STATUS: u32 = 0x20;
    pub const INT_RAW: u32 = 0x24;
    /// A set bit masks the interrupt.
    pub const INT_MASK: u32 = 0x28;
    /// Write 1 to clear.
    pub const INT_CLEAR: u32 = 0x2C;
    pub const INT_ALL: u32 = 0x1F;
    pub const INT_ALL_OVER: u32 = 1 << 0;
}

/// Field offsets within the result layer block.
pub mod result {
    pub const ADDR: u32 = 0x00;
    /// Width in bits 15:0, height in 31:16.
    pub const CANVAS: u32 = 0x04;
    pub const LINE_LEN: u32 = 0x08;
    /// Same packing as [`super::input::PIC_CFG`], minus the input-only fields.
    pub const PIC_CFG: u32 = 0x0C;
}

/// Field offsets within an input layer block.
pub mod input {
    pub const ADDR: u32 = 0x00;
    /// Width in bits 15:0, height in 31:16.
    pub const PIC_SIZE: u32 = 0x04;
    pub const LINE_LEN: u32 = 0x08;
    pub const PIC_CFG: u32 = 0x0C;
    pub const CONST_PIXEL: u32 = 0x10;
    pub const KEY_MIN: u32 = 0x14;
    pub const KEY_MAX: u32 = 0x18;
    /// `x_min` in bits 15:0, `y_min` in 31:16.
    pub const WIN_MIN: u32 = 0x1C;
    /// `x_max` in bits 15:0, `y_max` in 31:16, exclusive.
    pub const WIN_MAX: u32 = 0x20;
    /// Nine consecutive Q16.16 words, row-major.
    pub const MATRIX: u32 = 0x24;
    pub const OPACITY: u32 = 0x48;
    /// Bytes of the block in use.
    pub const SIZE: u32 = 0x4C;
}

/// `PIC_CFG` field packing.
pub mod pic_cfg {
    pub const FORMAT_SHIFT: u32 = 0;
    pub const FORMAT_MASK: u32 = 0x3F;
    pub const CONST_SOURCE: u32 = 1 << 6;
    pub const KEY_SHIFT: u32 = 8;
    pub const KEY_INSIDE: u32 = 1;
    pub const KEY_OUTSIDE: u32 = 2;
    pub const READ_2X2: u32 = 1 << 10;
    pub const BURST_SHIFT: u32 = 12;
    pub const HS_EN: u32 = 1 << 16;
    pub const HS_ACTIVE_LOW: u32 = 1 << 17;
    pub const HS_BURST_LOG_SHIFT: u32 = 18;
    pub const HS_INDEX_SHIFT: u32 = 24;
}

/// Absolute address of register `offset` in input layer `n` (1-based).
pub fn input_reg(generation: Generation, n: usize, offset: u32) -> u32 {
    generation.base()
        + generation.input_base()
        + (n as u32 - 1) * generation.layer_stride()
        + offset
}

pub fn result_reg(generation: Generation, offset: u32) -> u32 {
    generation.base() + generation.result_base() + offset
}

pub fn glb_reg(generation: Generation, offset: u32) -> u32 {
    generation.base() + offset
}

fn pack(lo: u16, hi: u16) -> u32 {
    u32::from(lo) | u32::from(hi) << 16
}

fn handshake_bits(hs: &Option<Handshake>) -> u32 {
    use pic_cfg::*;
    match hs {
        None => 0,
        Some(hs) => {
            let pol = match hs.polarity {
                Polarity::ActiveHigh => 0,
                Polarity::ActiveLow => HS_ACTIVE_LOW,
            };
            HS_EN
                | pol
                | u32::from(hs.burst_size_log & 0x7) << HS_BURST_LOG_SHIFT
                | u32::from(hs.index & 0xF) << HS_INDEX_SHIFT
        }
    }
}

/// Packs an input layer's `PIC_CFG` word.
pub fn input_pic_cfg(layer: &InputLayer) -> u32 {
    use crate::buffer::KeyMode;
    use crate::layer::ReadMatrix;
    use pic_cfg::*;

    let mut cfg = (layer.format.code() & FORMAT_MASK) << FORMAT_SHIFT;
    if let PixelSource::Constant(_) = layer.source {
        cfg |= CONST_SOURCE;
    }
    if let Some(key) = &layer.color_key {
        let mode = match key.mode {
            KeyMode::Inside => KEY_INSIDE,
            KeyMode::Outside => KEY_OUTSIDE,
        };
        cfg |= mode << KEY_SHIFT;
    }
    if layer.read_matrix == ReadMatrix::TwoByTwo {
        cfg |= READ_2X2;
    }
    cfg |= (layer.burst as u32) << BURST_SHIFT;
    cfg | handshake_bits(&layer.handshake)
}

pub fn result_pic_cfg(layer: &ResultLayer) -> u32 {
    use pic_cfg::*;
    (layer.format.code() & FORMAT_MASK) << FORMAT_SHIFT
        | (layer.burst as u32) << BURST_SHIFT
        | handshake_bits(&layer.handshake)
}

fn write_input<B: Bus>(
    bus: &mut B,
    generation: Generation,
    n: usize,
    layer: &InputLayer,
) {
    let reg = |offset| input_reg(generation, n, offset);

    let const_pixel = match layer.source {
        PixelSource::Constant(c) => c,
        PixelSource::Memory => 0,
    };
    let (key_min, key_max) =
        layer.color_key.map_or((0, 0), |k| (k.min, k.max));
    let window = &layer.window;

    bus.write(reg(input::ADDR), layer.address);
    bus.write(reg(input::PIC_SIZE), pack(layer.width, layer.height));
    bus.write(reg(input::LINE_LEN), layer.line_length);
    bus.write(reg(input::PIC_CFG), input_pic_cfg(layer));
    bus.write(reg(input::CONST_PIXEL), const_pixel);
    bus.write(reg(input::KEY_MIN), key_min);
    bus.write(reg(input::KEY_MAX), key_max);
    bus.write(reg(input::WIN_MIN), pack(window.x_min, window.y_min));
    bus.write(reg(input::WIN_MAX), pack(window.x_max, window.y_max));
    for (i, &w) in layer.matrix.words().iter().enumerate() {
        bus.write(reg(input::MATRIX + 4 * i as u32), w);
    }
    bus.write(reg(input::OPACITY), u32::from(layer.opacity));

    log::trace!(
        "ppe: input {} @{:#010x} {}x{} cfg={:#x}",
        n,
        layer.address,
        layer.width,
        layer.height,
        input_pic_cfg(layer),
    );
}

fn write_result<B: Bus>(
    bus: &mut B,
    generation: Generation,
    layer: &ResultLayer,
) {
    let reg = |offset| result_reg(generation, offset);
    bus.write(reg(result::ADDR), layer.address);
    bus.write(reg(result::CANVAS), pack(layer.width, layer.height));
    bus.write(reg(result::LINE_LEN), layer.line_length);
    bus.write(reg(result::PIC_CFG), result_pic_cfg(layer));
}

/// Writes every register `set` needs, leaving the engine ready to start.
///
/// `set` must already have passed [`LayerSet::validate`]. Disabled inputs
/// are only masked off in `LAYER_EN`; their blocks keep stale contents.
pub fn program<B: Bus>(bus: &mut B, generation: Generation, set: &LayerSet) {
    write_result(bus, generation, &set.result);
    for (i, layer) in set.inputs.iter().enumerate() {
        if let Some(layer) = layer {
            write_input(bus, generation, i + 1, layer);
        }
    }

    let mut reload = 0;
    if set.reload.auto_reload {
        reload |= glb::RELOAD_AUTO;
    }
    if let Some(llp) = set.reload.linked_list {
        reload |= glb::RELOAD_LLI;
        bus.write(glb_reg(generation, glb::LLP), llp);
    }
    bus.write(glb_reg(generation, glb::RELOAD), reload);
    bus.write(glb_reg(generation, glb::LAYER_EN), set.enable_mask());
}

/// Clock gate pokes. These two addresses live in the system control block,
/// outside the engine.
pub mod clock {
    /// Peripheral clock enable.
    pub const CLK_EN: u32 = 0x4000_0234;
    /// Peripheral function enable.
    pub const FUNC_EN: u32 = 0x4000_0210;
}

/// Gates the engine's clock and function enable on or off.
pub fn set_clock<B: Bus>(bus: &mut B, generation: Generation, on: bool) {
    let bit = generation.clock_bit();
    for &addr in [clock::CLK_EN, clock::FUNC_EN].iter() {
        bus.modify(addr, |v| if on { v | bit } else { v & !bit });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::Rect;
    use crate::buffer::{Buffer, ColorKey, KeyMode};
    use crate::layer::{Burst, ReadMatrix, Reload, Window};
    use crate::mock::MockBus;
    use crate::pixel::PixelFormat;

    #[test]
    fn blocks_are_indexed() {
        for &g in [Generation::Ppe, Generation::PpeV2].iter() {
            assert_eq!(
                input_reg(g, 2, input::ADDR) - input_reg(g, 1, input::ADDR),
                g.layer_stride()
            );
            assert!(input::SIZE <= g.layer_stride());
            assert!(result_reg(g, result::PIC_CFG) < input_reg(g, 1, 0));
        }
    }

    #[test]
    fn pic_cfg_packing() {
        let buf = Buffer::new(0x100, PixelFormat::Rgb565, 4, 4)
            .with_color_key(ColorKey {
                min: 1,
                max: 2,
                mode: KeyMode::Outside,
            })
            .with_high_quality(true);
        let window = Window::full(4, 4);
        let mut layer =
            InputLayer::from_buffer(&buf, Default::default(), window);
        layer.burst = Burst::Incr8;
        layer.handshake = Some(Handshake {
            index: 5,
            polarity: Polarity::ActiveLow,
            burst_size_log: 3,
        });
        assert_eq!(layer.read_matrix, ReadMatrix::TwoByTwo);
        let cfg = input_pic_cfg(&layer);
        assert_eq!(cfg & pic_cfg::FORMAT_MASK, PixelFormat::Rgb565.code());
        assert_eq!(cfg >> pic_cfg::KEY_SHIFT & 3, pic_cfg::KEY_OUTSIDE);
        assert_ne!(cfg & pic_cfg::READ_2X2, 0);
        assert_eq!(cfg >> pic_cfg::BURST_SHIFT & 3, 2);
        assert_ne!(cfg & pic_cfg::HS_EN, 0);
        assert_ne!(cfg & pic_cfg::HS_ACTIVE_LOW, 0);
        assert_eq!(cfg >> pic_cfg::HS_BURST_LOG_SHIFT & 7, 3);
        assert_eq!(cfg >> pic_cfg::HS_INDEX_SHIFT & 0xF, 5);
        assert_eq!(cfg & pic_cfg::CONST_SOURCE, 0);
    }

    #[test]
    fn program_writes_layer_blocks() {
        let g = Generation::PpeV2;
        let target = Buffer::new(0x6000_0000, PixelFormat::Argb8888, 64, 64);
        let rect = Rect::new(8, 8, 16, 16);
        let set = LayerSet::new(ResultLayer::for_rect(&target, &rect))
            .with_input(3, InputLayer::background(&target, &rect));

        let mut bus = MockBus::new(g);
        program(&mut bus, g, &set);

        assert_eq!(bus.peek(glb_reg(g, glb::LAYER_EN)), 0b1001);
        assert_eq!(
            bus.peek(input_reg(g, 3, input::ADDR)),
            target.pixel_address(8, 8)
        );
        assert_eq!(bus.peek(input_reg(g, 3, input::PIC_SIZE)), 16 | 16 << 16);
        assert_eq!(bus.peek(input_reg(g, 3, input::MATRIX)), 0x1_0000);
        assert_eq!(bus.peek(input_reg(g, 3, input::WIN_MAX)), 16 | 16 << 16);
        assert_eq!(bus.peek(result_reg(g, result::LINE_LEN)), 256);
        // Layer 1 was never touched.
        assert_eq!(bus.writes_to(input_reg(g, 1, input::ADDR)), 0);
    }

    #[test]
    fn program_writes_reload() {
        let g = Generation::Ppe;
        let target = Buffer::new(0x6000_0000, PixelFormat::Rgb565, 32, 32);
        let rect = Rect::new(0, 0, 32, 32);
        let plain = LayerSet::new(ResultLayer::for_rect(&target, &rect))
            .with_input(1, InputLayer::background(&target, &rect));

        let mut bus = MockBus::new(g);
        program(&mut bus, g, &plain);
        assert_eq!(bus.peek(glb_reg(g, glb::RELOAD)), 0);
        assert_eq!(bus.writes_to(glb_reg(g, glb::LLP)), 0);

        let chained = LayerSet {
            reload: Reload {
                auto_reload: true,
                linked_list: Some(0x2000_0100),
            },
            ..plain
        };
        let mut bus = MockBus::new(g);
        program(&mut bus, g, &chained);
        assert_eq!(bus.peek(glb_reg(g, glb::LLP)), 0x2000_0100);
        assert_eq!(
            bus.peek(glb_reg(g, glb::RELOAD)),
            glb::RELOAD_AUTO | glb::RELOAD_LLI
        );

        // Continuation settings land before the layers are enabled.
        let log = bus.log();
        let at = |addr| log.iter().position(|&(a, _)| a == addr).unwrap();
        assert!(at(glb_reg(g, glb::LLP)) < at(glb_reg(g, glb::LAYER_EN)));
        assert!(at(glb_reg(g, glb::RELOAD)) < at(glb_reg(g, glb::LAYER_EN)));

        let auto_only = LayerSet {
            reload: Reload {
                auto_reload: true,
                linked_list: None,
            },
            ..plain
        };
        let mut bus = MockBus::new(g);
        program(&mut bus, g, &auto_only);
        assert_eq!(bus.peek(glb_reg(g, glb::RELOAD)), glb::RELOAD_AUTO);
        assert_eq!(bus.writes_to(glb_reg(g, glb::LLP)), 0);
    }

    #[test]
    fn clock_gate_sets_and_clears() {
        let g = Generation::Ppe;
        let mut bus = MockBus::new(g);
        set_clock(&mut bus, g, true);
        assert_eq!(bus.peek(clock::CLK_EN), g.clock_bit());
        assert_eq!(bus.peek(clock::FUNC_EN), g.clock_bit());
        set_clock(&mut bus, g, false);
        assert_eq!(bus.peek(clock::CLK_EN), 0);
    }
}
