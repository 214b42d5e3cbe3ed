// ==========================================
// PU 切割仓储系统 - 库位填充顺序
// ==========================================
// 规则: 按货架声明顺序;每个货架内先正面（全部列 E→M）,
//       正面全部走完后再背面（全部列 D→A）
// 红线: 顺序固定且确定,不依赖数据库返回顺序
// ==========================================

use crate::domain::slot::{RackLayout, RackRange, SlotCode};

/// 正面行（靠通道）,升序
pub const FRONT_ROWS: [char; 9] = ['E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M'];

/// 背面行,降序
pub const BACK_ROWS: [char; 4] = ['D', 'C', 'B', 'A'];

/// 单个货架的候选序列
pub fn rack_fill_order(rack: &RackRange) -> Vec<SlotCode> {
    let front = rack
        .columns()
        .flat_map(|col| FRONT_ROWS.iter().map(move |&row| (row, col)));
    let back = rack
        .columns()
        .flat_map(|col| BACK_ROWS.iter().map(move |&row| (row, col)));

    front
        .chain(back)
        .filter_map(|(row, col)| SlotCode::new(row, col).ok())
        .collect()
}

/// 全部货架的候选序列: (货架名, 库位编码)
pub fn fill_order(layout: &RackLayout) -> Vec<(String, SlotCode)> {
    layout
        .racks()
        .iter()
        .flat_map(|rack| {
            rack_fill_order(rack)
                .into_iter()
                .map(move |code| (rack.name.clone(), code))
        })
        .collect()
}
