// 构建脚本: 链接静态FFmpeg所需的系统库
fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // 仅在Windows MSVC环境下添加FFmpeg相关库
    #[cfg(all(target_os = "windows", target_env = "msvc"))]
    {
        // Intel QSV (Quick Sync Video) 硬件解码
        println!("cargo:rustc-link-lib=dylib=libmfx");

        // OLE 自动化和VFW (libavformat 容器探测)
        println!("cargo:rustc-link-lib=dylib=oleaut32");
        println!("cargo:rustc-link-lib=dylib=vfw32");

        // Secure Channel (网络输入协议)
        println!("cargo:rustc-link-lib=dylib=secur32");
    }
}
