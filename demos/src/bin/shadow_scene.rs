//! # Shadow Scene Demo
//!
//! Demonstrates:
//! - Building a scene with lit, unlit and instanced meshes
//! - A shadow casting sun and spot light
//! - A feedback texture compute system running ahead of the render passes
//! - Loading renderer settings from a RON file
//!
//! Runs headless on the dummy backend and logs what each frame recorded.
//!
//! ```text
//! shadow_scene --frames 10 --samples 4 --config renderer.ron
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Once};

use clap::Parser;
use glam::{Mat4, Quat, Vec3, Vec4};
use lumen_graphics::materials::builtin_program;
use lumen_graphics::{
    BasicColorMaterial, Camera, CommandBuffer, Geometry, GraphicsDevice, GraphicsError,
    InstancedMesh, Light, Mesh, Node, NodeId, RenderContext, RenderPassDescriptor, Renderer,
    RendererConfig, Scene, ShaderProgram, StandardMaterial, TextureComputeSystem,
    TextureDescriptor, TextureFormat, TextureUsage,
};

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid renderer config: {0}")]
    Config(#[from] ron::error::SpannedError),
    #[error(transparent)]
    Graphics(#[from] GraphicsError),
    #[error("scene node missing: {0}")]
    MissingNode(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl From<ColorChoice> for env_logger::WriteStyle {
    fn from(choice: ColorChoice) -> Self {
        match choice {
            ColorChoice::Auto => env_logger::WriteStyle::Auto,
            ColorChoice::Always => env_logger::WriteStyle::Always,
            ColorChoice::Never => env_logger::WriteStyle::Never,
        }
    }
}

/// Render a small shadowed scene on the headless backend.
#[derive(Parser, Debug)]
#[command(name = "shadow_scene", version)]
struct Args {
    /// Number of frames to render.
    #[arg(long, default_value = "3")]
    frames: u32,

    /// Target width in pixels.
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Target height in pixels.
    #[arg(long, default_value = "720")]
    height: u32,

    /// MSAA sample count (1 or 4).
    #[arg(long, default_value = "1")]
    samples: u32,

    /// RON file with renderer settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter in env_logger syntax, overrides RUST_LOG.
    #[arg(long)]
    log: Option<String>,

    /// When to color log output.
    #[arg(long, default_value = "auto", value_enum)]
    color: ColorChoice,
}

/// Logger configuration.
#[derive(Debug, Clone)]
struct LoggingConfig {
    env_filter: Option<String>,
    write_style: env_logger::WriteStyle,
}

static LOGGING: Once = Once::new();

fn init_logging(config: LoggingConfig) {
    LOGGING.call_once(|| {
        let mut builder = env_logger::Builder::new();
        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }
        builder.write_style(config.write_style);
        builder.init();
    });
}

fn load_config(path: Option<&PathBuf>) -> Result<RendererConfig, DemoError> {
    let Some(path) = path else {
        return Ok(RendererConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|source| DemoError::Io {
        path: path.clone(),
        source,
    })?;
    let config = RendererConfig::from_ron(&text)?;
    log::info!("Loaded renderer config from {}", path.display());
    Ok(config)
}

struct Demo {
    device: Arc<GraphicsDevice>,
    renderer: Renderer,
    scene: Scene,
    camera: Camera,
    spinner: NodeId,
}

impl Demo {
    fn new(args: &Args, config: RendererConfig) -> Result<Self, DemoError> {
        let device = GraphicsDevice::dummy();
        let context = RenderContext::new(Arc::clone(&device)).with_sample_count(args.samples);
        let mut renderer = Renderer::with_config(context, config)?;
        renderer.resize(args.width, args.height);

        let program = Arc::new(builtin_program());
        renderer.add_compute_system(noise_system(&device)?);

        let mut scene = Scene::new("Shadow Scene");

        let sun_light =
            Light::directional(Vec3::new(1.0, 0.95, 0.9), 3.0).with_cast_shadow(true);
        let mut sun = Node::new("Sun")
            .with_position(Vec3::new(4.0, 10.0, 4.0))
            .with_light(sun_light);
        sun.look_at(Vec3::ZERO, Vec3::Y);
        scene.add(sun);

        let spot_light =
            Light::spot(Vec3::new(0.4, 0.6, 1.0), 8.0, 12.0, 20.0, 30.0).with_cast_shadow(true);
        let mut spot = Node::new("Spot")
            .with_position(Vec3::new(-3.0, 4.0, 0.0))
            .with_light(spot_light);
        spot.look_at(Vec3::ZERO, Vec3::Y);
        scene.add(spot);

        scene.add(Node::new("Fill").with_light(Light::point(Vec3::ONE, 0.5, 20.0)));

        let ground = Mesh::new("Ground", Geometry::quad(20.0, 20.0))
            .with_material(
                StandardMaterial::new(Arc::clone(&program))
                    .with_base_color(Vec4::new(0.6, 0.6, 0.6, 1.0)),
            )
            .with_shadows(false, true);
        scene.add(
            Node::new("Ground")
                .with_renderable(ground)
                .with_transform(lumen_core::Transform::default().with_orientation(
                    Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
                )),
        );

        let pivot = scene.add(Node::new("Pivot").with_position(Vec3::new(0.0, 1.0, 0.0)));
        let cube = Mesh::new("Cube", Geometry::cube(1.0))
            .with_material(
                StandardMaterial::new(Arc::clone(&program))
                    .with_base_color(Vec4::new(0.9, 0.2, 0.2, 1.0)),
            )
            .with_shadows(true, true);
        let spinner = scene
            .add_to(pivot, Node::new("Spinner").with_renderable(cube))
            .map_err(|_| DemoError::MissingNode("Pivot"))?;

        let yellow = Vec4::new(1.0, 1.0, 0.0, 1.0);
        let marker = Mesh::new("Marker", Geometry::quad(0.5, 0.5))
            .with_material(BasicColorMaterial::new(Arc::clone(&program), yellow))
            .with_shadows(true, false);
        let marker = Node::new("Marker")
            .with_position(Vec3::new(0.0, 1.5, 0.0))
            .with_renderable(marker);
        scene
            .add_to(pivot, marker)
            .map_err(|_| DemoError::MissingNode("Pivot"))?;

        let mut pillars = InstancedMesh::new("Pillars", Geometry::cube(0.5), 8)
            .with_material(StandardMaterial::new(Arc::clone(&program)))
            .with_shadows(true, true);
        for i in 0..8 {
            let angle = i as f32 / 8.0 * std::f32::consts::TAU;
            pillars.set_matrix_at(
                i,
                Mat4::from_translation(Vec3::new(angle.cos() * 5.0, 0.25, angle.sin() * 5.0)),
            );
        }
        scene.add(Node::new("Pillars").with_renderable(pillars));

        let mut camera = Camera::perspective(60.0, 0.1, 100.0).with_label("Main Camera");
        camera.set_position(Vec3::new(0.0, 6.0, 12.0));
        camera.look_at(Vec3::ZERO, Vec3::Y);

        Ok(Self {
            device,
            renderer,
            scene,
            camera,
            spinner,
        })
    }

    fn frame(&mut self, index: u32) -> Result<(), DemoError> {
        let node = self
            .scene
            .get_mut(self.spinner)
            .ok_or(DemoError::MissingNode("Spinner"))?;
        node.set_orientation(Quat::from_rotation_y(index as f32 * 0.1));

        let mut descriptor = RenderPassDescriptor::new();
        let mut command_buffer = self.device.create_command_buffer(format!("Frame {index}"));
        self.renderer
            .draw(&mut descriptor, &mut command_buffer, &mut self.scene, &mut self.camera)?;
        log_frame(index, &command_buffer);
        self.device.submit(command_buffer)?;
        Ok(())
    }
}

fn noise_system(device: &Arc<GraphicsDevice>) -> Result<TextureComputeSystem, GraphicsError> {
    let program = Arc::new(
        ShaderProgram::new("Noise", Vec::<u8>::new())
            .with_entry_point("noise_reset")
            .with_entry_point("noise_update"),
    );
    let descriptor =
        TextureDescriptor::new_2d(256, 256, TextureFormat::Rgba32Float, TextureUsage::SHADER_READ);
    let mut system = TextureComputeSystem::new(device, "Noise", vec![descriptor], true)?;
    system.set_program(&program, Some("noise_reset"), "noise_update")?;
    Ok(system)
}

fn log_frame(index: u32, command_buffer: &CommandBuffer) {
    let compute = command_buffer.compute_passes().count();
    let render: Vec<_> = command_buffer.render_passes().collect();
    let draws: usize = render.iter().map(|pass| pass.draw_count()).sum();
    log::info!(
        "Frame {}: {} compute passes, {} render passes, {} draws",
        index,
        compute,
        render.len(),
        draws
    );
}

fn run(args: &Args) -> Result<(), DemoError> {
    let config = load_config(args.config.as_ref())?;
    let mut demo = Demo::new(args, config)?;
    for index in 0..args.frames {
        demo.frame(index)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(LoggingConfig {
        env_filter: args.log.clone(),
        write_style: args.color.into(),
    });
    lumen_graphics::init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
