use image::RgbImage;

/// デコード済みの RGB フレーム
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// 生の RGB バイト列から作成。長さが width*height*3 と一致しなければ None
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(Self::new)
    }

    /// 黒で塗りつぶされたフレーム
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbImage::new(width, height))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// 幅か高さが 0
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}
