// Command-line knobs. Defaults match what the window shows without any flags.

use crate::camera::CameraRequest;
use crate::interaction::{InteractionConfig, Tool};
use crate::render_loop::OutlineStyle;
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "overlay-cam", version, about = "Live camera view with a movable, resizable rectangle")]
pub struct Args {
    /// List cameras and exit
    #[arg(long)]
    pub list: bool,

    /// Camera index to open
    #[arg(long, default_value_t = 0)]
    pub camera: u32,

    /// Requested capture width (the device may pick the closest it supports)
    #[arg(long, default_value_t = 640)]
    pub width: u32,

    /// Requested capture height
    #[arg(long, default_value_t = 480)]
    pub height: u32,

    /// Requested camera frame rate
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Window refresh rate; one render cycle per refresh at most
    #[arg(long, default_value_t = 60)]
    pub refresh_rate: usize,

    /// Side of the square resize handle at a rectangle's bottom-right corner
    #[arg(long, default_value_t = 10.0)]
    pub handle_size: f32,

    /// How many rectangles may exist at once
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub max_rects: u16,

    /// Tool active at startup
    #[arg(long, value_enum, default_value_t = ToolArg::Edit)]
    pub tool: ToolArg,

    /// Outline color as RRGGBB hex
    #[arg(long, default_value = "FFCC33", value_parser = parse_color)]
    pub color: u32,

    /// Outline thickness in pixels
    #[arg(long, default_value_t = 2)]
    pub thickness: u32,

    /// Open the window without starting capture (press S to start)
    #[arg(long)]
    pub paused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ToolArg {
    Edit,
    Draw,
}

impl From<ToolArg> for Tool {
    fn from(t: ToolArg) -> Self {
        match t {
            ToolArg::Edit => Tool::Edit,
            ToolArg::Draw => Tool::Draw,
        }
    }
}

fn parse_color(s: &str) -> Result<u32, String> {
    let hex = s.trim_start_matches('#');
    if hex.len() != 6 {
        return Err(format!("expected RRGGBB, got {s:?}"));
    }
    u32::from_str_radix(hex, 16).map_err(|e| format!("bad color {s:?}: {e}"))
}

impl Args {
    pub fn camera_request(&self) -> CameraRequest {
        CameraRequest { index: self.camera, width: self.width, height: self.height, fps: self.fps }
    }

    pub fn interaction(&self) -> InteractionConfig {
        InteractionConfig {
            handle_size: self.handle_size,
            max_rects: self.max_rects as usize,
            tool: self.tool.into(),
        }
    }

    pub fn outline(&self) -> OutlineStyle {
        OutlineStyle { color: self.color, thickness: self.thickness }
    }
}
