//! 显示模块 - 可选的本地显示输出

use anyhow::Result;

/// 显示接收端 trait
///
/// 可选协作者：启动时缺失不致命，渲染失败由调用方忽略。
pub trait DisplaySink {
    /// 在指定坐标渲染一行文本
    fn render(&mut self, text: &str, x: u32, y: u32) -> Result<()>;

    /// 清屏
    fn clear(&mut self) -> Result<()>;
}

/// 控制台显示（宿主机适配器）
#[derive(Debug, Default)]
pub struct ConsoleDisplay;

impl ConsoleDisplay {
    /// 创建控制台显示
    pub fn new() -> Self {
        Self
    }
}

impl DisplaySink for ConsoleDisplay {
    fn render(&mut self, text: &str, _x: u32, _y: u32) -> Result<()> {
        println!("[display] {}", text);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_display_never_fails() {
        let mut display = ConsoleDisplay::new();
        assert!(display.render("21.37 C", 0, 0).is_ok());
        assert!(display.clear().is_ok());
    }
}
