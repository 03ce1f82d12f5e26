// Screen capture primitive backed by the X11 root window

use anyhow::{bail, Context, Result};
use image::RgbaImage;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt, ImageFormat, ImageOrder};

pub trait ScreenGrabber: Send + Sync {
    fn grab(&self) -> Result<RgbaImage>;
}

// Grabs the full default screen of $DISPLAY
pub struct X11Grabber;

impl ScreenGrabber for X11Grabber {
    fn grab(&self) -> Result<RgbaImage> {
        let (conn, screen_num) = x11rb::connect(None)
            .context("Failed to connect to X server")?;

        let setup = conn.setup();
        let screen = &setup.roots[screen_num];
        let (width, height) = (screen.width_in_pixels, screen.height_in_pixels);

        let reply = conn
            .get_image(ImageFormat::Z_PIXMAP, screen.root, 0, 0, width, height, !0)
            .context("Failed to request root window image")?
            .reply()
            .context("Failed to read root window image")?;

        if setup.image_byte_order != ImageOrder::LSB_FIRST {
            bail!("Unsupported X11 image byte order");
        }

        bgrx_to_rgba(u32::from(width), u32::from(height), &reply.data)
    }
}

// 32-bpp ZPixmap rows (B, G, R, pad) into an opaque RGBA image
fn bgrx_to_rgba(width: u32, height: u32, data: &[u8]) -> Result<RgbaImage> {
    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        bail!(
            "Unsupported X11 pixel layout: {} bytes for {}x{} screen",
            data.len(),
            width,
            height
        );
    }

    let rgba = data
        .chunks_exact(4)
        .flat_map(|px| [px[2], px[1], px[0], 0xff])
        .collect();

    RgbaImage::from_raw(width, height, rgba).context("Screen image buffer has the wrong size")
}
