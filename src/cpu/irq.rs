pub const IRQ_IRQ2: u8 = 0x01;
pub const IRQ_IRQ1: u8 = 0x02;
pub const IRQ_TIMER: u8 = 0x04;
const IRQ_MASK: u8 = IRQ_IRQ2 | IRQ_IRQ1 | IRQ_TIMER;

/// HuC6280 interrupt disable (IDR) and request (IRR) registers.
///
/// IRQ1 and IRQ2 are level inputs driven by the VDC and the CD-ROM
/// collaborator. The timer request is a latch cleared by writing the
/// acknowledge port.
#[derive(Clone, Debug, Default, bincode::Encode, bincode::Decode)]
pub struct InterruptController {
    disable: u8,
    request: u8,
}

impl InterruptController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn set_irq1(&mut self, line_on: bool) {
        self.set_line(IRQ_IRQ1, line_on);
    }

    pub fn set_irq2(&mut self, line_on: bool) {
        self.set_line(IRQ_IRQ2, line_on);
    }

    pub fn raise_timer(&mut self) {
        self.request |= IRQ_TIMER;
    }

    pub fn acknowledge_timer(&mut self) {
        self.request &= !IRQ_TIMER;
    }

    pub fn disable_mask(&self) -> u8 {
        self.disable
    }

    pub fn write_disable(&mut self, value: u8) {
        self.disable = value & IRQ_MASK;
    }

    pub fn request(&self) -> u8 {
        self.request
    }

    /// Request bits that are not masked by IDR.
    pub fn pending(&self) -> u8 {
        self.request & !self.disable & IRQ_MASK
    }

    fn set_line(&mut self, bit: u8, on: bool) {
        if on {
            self.request |= bit;
        } else {
            self.request &= !bit;
        }
    }
}
