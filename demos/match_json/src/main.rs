use std::path::PathBuf;

use argh::FromArgs;
use serde::Deserialize;

use featmatch::{BruteForceMatcher, DescriptorElement, MatchMask, MatchResult, MatcherParams};

#[derive(FromArgs, Debug)]
/// Match two descriptor sets read from a JSON scene file and print the result as JSON.
struct Args {
    /// path to the scene file with descriptors, keypoints and an optional mask
    #[argh(positional)]
    scene: PathBuf,

    /// path to a JSON file with the matcher parameters
    #[argh(option, short = 'p')]
    params: Option<PathBuf>,
}

/// Descriptor rows, tagged by element type.
#[derive(Deserialize)]
#[serde(tag = "type", content = "rows", rename_all = "lowercase")]
enum Descriptors {
    Binary(Vec<Vec<u8>>),
    Float(Vec<Vec<f32>>),
}

#[derive(Deserialize)]
struct Scene {
    descriptors1: Descriptors,
    descriptors2: Descriptors,
    keypoints1: Vec<[f64; 2]>,
    keypoints2: Vec<[f64; 2]>,
    #[serde(default)]
    mask: Option<Vec<Vec<bool>>>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let params = match &args.params {
        Some(path) => MatcherParams::from_json_file(path)?,
        None => MatcherParams::default(),
    };
    let matcher = BruteForceMatcher::from_params(&params)?;
    log::info!("Matcher configuration: {:?}", matcher.config());

    let scene: Scene = serde_json::from_str(&std::fs::read_to_string(&args.scene)?)?;
    let mask = scene.mask.as_deref().map(MatchMask::from_rows).transpose()?;

    let result = match (&scene.descriptors1, &scene.descriptors2) {
        (Descriptors::Binary(d1), Descriptors::Binary(d2)) => {
            dispatch_width(&matcher, d1, d2, &scene, mask.as_ref())?
        }
        (Descriptors::Float(d1), Descriptors::Float(d2)) => {
            dispatch_width(&matcher, d1, d2, &scene, mask.as_ref())?
        }
        _ => return Err("both descriptor sets must have the same type".into()),
    };

    log::info!(
        "raw={} filtered={} good={:?}",
        result.stats.num_raw_matches,
        result.stats.num_filtered_matches,
        result.stats.num_good_matches
    );
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

/// Run the matcher for the descriptor widths produced by common extractors.
fn dispatch_width<T: DescriptorElement>(
    matcher: &BruteForceMatcher,
    d1: &[Vec<T>],
    d2: &[Vec<T>],
    scene: &Scene,
    mask: Option<&MatchMask>,
) -> Result<MatchResult, Box<dyn std::error::Error>> {
    let width = d1.first().or(d2.first()).map_or(0, Vec::len);
    match width {
        32 => run::<T, 32>(matcher, d1, d2, scene, mask),
        64 => run::<T, 64>(matcher, d1, d2, scene, mask),
        128 => run::<T, 128>(matcher, d1, d2, scene, mask),
        w => Err(format!("unsupported descriptor width {w}").into()),
    }
}

fn run<T: DescriptorElement, const N: usize>(
    matcher: &BruteForceMatcher,
    d1: &[Vec<T>],
    d2: &[Vec<T>],
    scene: &Scene,
    mask: Option<&MatchMask>,
) -> Result<MatchResult, Box<dyn std::error::Error>> {
    let d1 = to_rows::<T, N>(d1)?;
    let d2 = to_rows::<T, N>(d2)?;
    Ok(matcher.match_descriptors(&d1, &d2, &scene.keypoints1, &scene.keypoints2, mask)?)
}

fn to_rows<T: DescriptorElement, const N: usize>(
    rows: &[Vec<T>],
) -> Result<Vec<[T; N]>, Box<dyn std::error::Error>> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            <[T; N]>::try_from(row.as_slice()).map_err(|_| {
                let msg = format!("descriptor row {i} has {} elements, expected {N}", row.len());
                Box::<dyn std::error::Error>::from(msg)
            })
        })
        .collect()
}
