use crate::vce::VideoSource;
use crate::vdc::Vdc;
use crate::vpc::{combined_irq, Vpc};

/// Second VDC and the priority controller of a SuperGrafx.
#[derive(Clone, Debug, Default, bincode::Encode, bincode::Decode)]
pub struct SuperGrafx {
    pub vdc2: Vdc,
    pub vpc: Vpc,
}

/// Everything that feeds dots to the VCE.
#[derive(Clone, Debug, bincode::Encode, bincode::Decode)]
pub struct Video {
    pub vdc1: Vdc,
    pub sgx: Option<SuperGrafx>,
}

impl Video {
    pub fn new(sgx: bool, no_sprite_limit: bool) -> Self {
        let mut video = Self {
            vdc1: Vdc::new(),
            sgx: sgx.then(SuperGrafx::default),
        };
        video.set_no_sprite_limit(no_sprite_limit);
        video
    }

    pub fn reset(&mut self) {
        self.vdc1.reset();
        if let Some(sgx) = self.sgx.as_mut() {
            sgx.vdc2.reset();
            sgx.vpc.reset();
        }
    }

    pub fn set_no_sprite_limit(&mut self, enabled: bool) {
        self.vdc1.set_no_sprite_limit(enabled);
        if let Some(sgx) = self.sgx.as_mut() {
            sgx.vdc2.set_no_sprite_limit(enabled);
        }
    }

    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        self.vdc1.validate()?;
        match self.sgx.as_ref() {
            Some(sgx) => sgx.vdc2.validate(),
            None => Ok(()),
        }
    }

    pub fn is_sgx(&self) -> bool {
        self.sgx.is_some()
    }

    /// VDC that ST0/ST1/ST2 currently address.
    pub fn st_target(&mut self) -> &mut Vdc {
        match self.sgx.as_mut() {
            Some(sgx) if sgx.vpc.st_targets_vdc2() => &mut sgx.vdc2,
            _ => &mut self.vdc1,
        }
    }

    pub fn irq_asserted(&self) -> bool {
        match self.sgx.as_ref() {
            Some(sgx) => combined_irq(&self.vdc1, &sgx.vdc2),
            None => self.vdc1.irq_asserted(),
        }
    }

    pub fn read_port(&mut self, offset: u16) -> u8 {
        match self.sgx.as_mut() {
            None => self.vdc1.read_port(offset),
            Some(sgx) => match offset & 0x18 {
                0x00 => self.vdc1.read_port(offset),
                0x08 => sgx.vpc.read_register(offset),
                0x10 => sgx.vdc2.read_port(offset),
                _ => 0xFF,
            },
        }
    }

    pub fn write_port(&mut self, offset: u16, value: u8) {
        match self.sgx.as_mut() {
            None => self.vdc1.write_port(offset, value),
            Some(sgx) => match offset & 0x18 {
                0x00 => self.vdc1.write_port(offset, value),
                0x08 => sgx.vpc.write_register(offset, value),
                0x10 => sgx.vdc2.write_port(offset, value),
                _ => {}
            },
        }
    }
}

impl VideoSource for Video {
    fn begin_line(&mut self, vsync: bool) {
        self.vdc1.begin_line(vsync);
        if let Some(sgx) = self.sgx.as_mut() {
            sgx.vdc2.begin_line(vsync);
            sgx.vpc.begin_line();
        }
    }

    fn dot(&mut self, divider: u32) -> u16 {
        let first = self.vdc1.clock(divider);
        match self.sgx.as_mut() {
            Some(sgx) => {
                let second = sgx.vdc2.clock(divider);
                sgx.vpc.compose_pixel(first, second)
            }
            None => first,
        }
    }
}
