use chrono::Utc;

fn main() {
    // 构建时间，启动日志和 /api/health 使用
    let build_time = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    println!("cargo:rustc-env=BUILD_TIME={}", build_time);
    println!("cargo:rerun-if-changed=build.rs");
}
