use burn_import::onnx::ModelGen;
use std::path::Path;

const VGG19_ONNX: &str = "models/vgg19.onnx";

fn main() {
    // Only with `--features build-vgg`: converts the VGG19 export into burn
    // source + `vgg19.mpk` under `model/`. Copy the record to `models/` for
    // `cvgen style --weights models/vgg19`.
    if std::env::var("CARGO_FEATURE_BUILD_VGG").is_err() {
        return;
    }
    println!("cargo:rerun-if-changed={VGG19_ONNX}");

    if !Path::new(VGG19_ONNX).exists() {
        println!("cargo:warning={VGG19_ONNX} not found, skipping VGG19 conversion");
        return;
    }

    ModelGen::new()
        .input(VGG19_ONNX)
        .out_dir("model/")
        .run_from_script();
}
