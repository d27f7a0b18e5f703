use super::{
    FetchedSprite, Vdc, CR_BACKGROUND, CR_IRQ_COLLISION, CR_IRQ_OVERFLOW, CR_SPRITES,
    LINE_BUFFER_SIZE, REG_CR, REG_MWR, TRANSPARENT_PIXEL, VDC_STATUS_CR, VDC_STATUS_OR,
    VRAM_WORDS,
};

const SPRITE_COUNT: usize = 64;
const SPRITE_LIMIT: usize = 16;
const SPRITE_PATTERN_WORDS: usize = 64;
const SPRITE_X_OFFSET: i16 = 32;

const SPRITE_FLAG_PALETTE: u16 = 0x000F;
const SPRITE_FLAG_PRIORITY: u16 = 0x0080;
const SPRITE_FLAG_WIDE: u16 = 0x0100;
const SPRITE_FLAG_X_FLIP: u16 = 0x0800;
const SPRITE_FLAG_HEIGHT: u16 = 0x3000;
const SPRITE_FLAG_Y_FLIP: u16 = 0x8000;

fn vram_word(vram: &[u16], addr: usize) -> u16 {
    vram[addr & (VRAM_WORDS - 1)]
}

/// Background map size in tiles from MWR bits 4-6.
fn map_dimensions(mwr: u16) -> (usize, usize) {
    let width = match (mwr >> 4) & 0x03 {
        0 => 32,
        1 => 64,
        _ => 128,
    };
    let height = if mwr & 0x40 != 0 { 64 } else { 32 };
    (width, height)
}

impl FetchedSprite {
    fn color(&self, column: usize) -> u16 {
        let block = column / 16;
        let bit = if self.x_flip { column % 16 } else { 15 - column % 16 };
        let planes = &self.planes[block];
        (0..4).fold(0, |color, plane| {
            color | (((planes[plane] >> bit) & 1) << plane)
        })
    }
}

impl Vdc {
    pub(super) fn render_line(&mut self) {
        let width = self.display_width();
        self.line_width = width;
        self.line_buffer.fill(TRANSPARENT_PIXEL);

        let cr = self.registers[REG_CR];
        if cr & CR_BACKGROUND != 0 {
            self.render_background(width);
        }
        if cr & CR_SPRITES != 0 {
            self.render_sprites(width);
        }
    }

    fn render_background(&mut self, width: usize) {
        let mwr = self.registers[REG_MWR];
        let (map_width, map_height) = map_dimensions(mwr);
        let y = self.bg_counter_y as usize & (map_height * 8 - 1);
        let row = y / 8;
        let fine_y = y % 8;
        // CG mode restricts 2-plane fetches to planes 0-1 or 2-3.
        let restrict = (mwr & 0x03 == 0x03).then_some(mwr & 0x80 != 0);

        let mut x = 0;
        while x < width {
            let px = (self.latched_bxr as usize + x) & (map_width * 8 - 1);
            let bat = vram_word(&self.vram, row * map_width + px / 8);
            let tile = (bat & 0x0FFF) as usize;
            let palette = bat >> 12;
            let addr = tile * 16 + fine_y;
            let mut low = vram_word(&self.vram, addr);
            let mut high = vram_word(&self.vram, addr + 8);
            match restrict {
                Some(false) => high = 0,
                Some(true) => low = 0,
                None => {}
            }

            let mut fine_x = px % 8;
            while fine_x < 8 && x < width {
                let bit = 7 - fine_x;
                let color = ((low >> bit) & 1)
                    | (((low >> (bit + 8)) & 1) << 1)
                    | (((high >> bit) & 1) << 2)
                    | (((high >> (bit + 8)) & 1) << 3);
                self.line_buffer[x] = if color == 0 { 0 } else { (palette << 4) | color };
                x += 1;
                fine_x += 1;
            }
        }
    }

    fn render_sprites(&mut self, width: usize) {
        let mut pixels = [0u16; LINE_BUFFER_SIZE];
        let mut priority = [false; LINE_BUFFER_SIZE];
        let mut collision = false;

        // Lower SAT indices win, so draw from the back.
        for sprite in self.sprites.iter().rev() {
            for column in 0..sprite.width as usize {
                let x = sprite.x as isize + column as isize;
                if x < 0 || x as usize >= width {
                    continue;
                }
                let x = x as usize;
                let color = sprite.color(column);
                if color == 0 {
                    continue;
                }
                if sprite.index == 0 && pixels[x] != 0 {
                    collision = true;
                }
                pixels[x] = TRANSPARENT_PIXEL | sprite.palette | color;
                priority[x] = sprite.priority;
            }
        }

        if collision && self.registers[REG_CR] & CR_IRQ_COLLISION != 0 {
            self.raise_status(VDC_STATUS_CR);
        }

        for x in 0..width {
            let sprite = pixels[x];
            if sprite == 0 {
                continue;
            }
            if priority[x] || self.line_buffer[x] & 0x0F == 0 {
                self.line_buffer[x] = sprite;
            }
        }
    }

    /// Collect the sprites intersecting `line`, in raster counter units.
    pub(super) fn fetch_sprites(&mut self, line: u16) {
        self.sprites.clear();
        let line = line as i32;

        for index in 0..SPRITE_COUNT {
            let base = index * 4;
            let y = (self.sat[base] & 0x03FF) as i32;
            let flags = self.sat[base + 3];
            let height: usize = match (flags & SPRITE_FLAG_HEIGHT) >> 12 {
                0 => 16,
                1 => 32,
                _ => 64,
            };
            let row = line - y;
            if row < 0 || row as usize >= height {
                continue;
            }

            if self.sprites.len() == SPRITE_LIMIT {
                if self.registers[REG_CR] & CR_IRQ_OVERFLOW != 0 {
                    self.raise_status(VDC_STATUS_OR);
                }
                if !self.no_sprite_limit {
                    break;
                }
            }

            let width: usize = if flags & SPRITE_FLAG_WIDE != 0 { 32 } else { 16 };
            let mut pattern = ((self.sat[base + 2] >> 1) & 0x03FF) as usize;
            if width == 32 {
                pattern &= !1;
            }
            match height {
                32 => pattern &= !2,
                64 => pattern &= !6,
                _ => {}
            }

            let mut row = row as usize;
            if flags & SPRITE_FLAG_Y_FLIP != 0 {
                row = height - 1 - row;
            }
            let x_flip = flags & SPRITE_FLAG_X_FLIP != 0;
            let blocks = width / 16;
            let mut planes = [[0u16; 4]; 2];
            for (block, slot) in planes.iter_mut().enumerate().take(blocks) {
                let column = if x_flip { blocks - 1 - block } else { block };
                let cell = pattern + (row / 16) * 2 + column;
                let addr = cell * SPRITE_PATTERN_WORDS + row % 16;
                for (plane, word) in slot.iter_mut().enumerate() {
                    *word = vram_word(&self.vram, addr + plane * 16);
                }
            }

            self.sprites.push(FetchedSprite {
                index: index as u8,
                x: (self.sat[base + 1] & 0x03FF) as i16 - SPRITE_X_OFFSET,
                width: width as u8,
                palette: (flags & SPRITE_FLAG_PALETTE) << 4,
                priority: flags & SPRITE_FLAG_PRIORITY != 0,
                x_flip,
                planes,
            });
        }
    }
}
