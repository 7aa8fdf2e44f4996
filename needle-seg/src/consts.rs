//! 通用常量.

/// 外部分割程序与图像文件的默认约定.
pub mod handoff {
    /// 外部针分割可执行程序的默认名字. 未指定路径时在 `PATH` 中查找.
    pub const DEFAULT_SOLVER_EXE: &str = "StaticNeedleTestBed";

    /// 交给外部程序的图像文件的默认文件名 (MetaImage 单文件格式).
    pub const DEFAULT_IMAGE_FILE_NAME: &str = "inputImage.mha";

    /// 工作目录在缓存目录下的子目录名.
    pub const WORK_DIR_NAME: &str = "static-needle";

    /// 外部程序默认超时时间, 以秒为单位.
    pub const DEFAULT_TIMEOUT_SECS: f64 = 300.0;

    /// 种子点坐标输出的有效数字位数.
    pub const SEED_SIGNIFICANT_DIGITS: usize = 10;

    /// 外部程序输出的浮点数个数: 针尖 (x, y, z) + 针尾 (x, y, z).
    pub const SOLVER_OUTPUT_LEN: usize = 6;
}

/// 误差评估相关常量.
pub mod metrics {
    /// 有效针尖 (active tip) 相对针尖的投影距离, 以毫米为单位.
    pub const ACTIVE_TIP_OFFSET_MM: f64 = 10.0;

    /// 长度不超过该值 (毫米) 的方向向量视为零向量.
    pub const ZERO_LENGTH_EPS: f64 = 1e-12;

    /// 会话内误差表的名字.
    pub const METRICS_TABLE_NAME: &str = "Metrics";

    /// 误差表的列名, 与 [`crate::MetricsRow`] 的字段一一对应.
    pub const METRICS_COLUMNS: [&str; 5] = [
        "Tip Difference (mm)",
        "Active Tip Difference (mm)",
        "Trajectory Difference (deg)",
        "Segmented Insertion Angle (deg)",
        "Insertion Angle Difference (deg)",
    ];
}
