fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Fall back to the bundled protoc when none is configured
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .compile_protos(&["proto/tensorflow_serving/apis/predict.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto");
    Ok(())
}
