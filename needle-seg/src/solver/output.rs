//! 外部程序输出的解析.

use crate::consts::handoff::SOLVER_OUTPUT_LEN;
use crate::geometry::Point3;
use crate::SolverFailure;

/// 外部程序坐标系下的针尖与针尾.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SolverPoints {
    /// 针尖.
    pub tip_solver: Point3,

    /// 针尾.
    pub tail_solver: Point3,
}

/// 解析外部程序的标准输出: 恰好六个以空白分隔的有限浮点数, 依次为针尖和针尾.
pub fn parse_solver_output(text: &str) -> Result<SolverPoints, SolverFailure> {
    let values = text
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| SolverFailure::BadFloat(tok.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    match values.as_slice() {
        &[x0, y0, z0, x1, y1, z1] => Ok(SolverPoints {
            tip_solver: Point3::new(x0, y0, z0),
            tail_solver: Point3::new(x1, y1, z1),
        }),
        other => Err(SolverFailure::WrongValueCount {
            expected: SOLVER_OUTPUT_LEN,
            got: other.len(),
            raw: text.trim().to_string(),
        }),
    }
}
