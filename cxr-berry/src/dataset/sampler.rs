//! 类平衡采样.

use rand::Rng;

use super::{LabelRecord, LabelTable};
use crate::consts::SAMPLER_RETRY_BUDGET;

/// 类平衡采样器. 以目标正类比例从标注表中无放回地抽取病例.
#[derive(Debug, Clone, Copy)]
pub struct BalancedSampler<'a> {
    table: &'a LabelTable,
    positive_split: f32,
}

/// 一次抽取的结果: 病例 id 序列与两类的最终计数.
#[derive(Debug, Clone)]
pub struct BalancedDraw {
    study_ids: Vec<String>,
    num_positive: usize,
    num_negative: usize,
}

impl BalancedDraw {
    /// 抽到的病例 id, 按抽取顺序排列.
    #[inline]
    pub fn study_ids(&self) -> &[String] {
        &self.study_ids
    }

    /// 取出病例 id 序列.
    #[inline]
    pub fn into_study_ids(self) -> Vec<String> {
        self.study_ids
    }

    /// 样本个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.study_ids.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.study_ids.is_empty()
    }

    /// 抽到的阳性样本数.
    #[inline]
    pub fn num_positive(&self) -> usize {
        self.num_positive
    }

    /// 抽到的阴性样本数.
    #[inline]
    pub fn num_negative(&self) -> usize {
        self.num_negative
    }
}

impl<'a> BalancedSampler<'a> {
    /// 构建采样器. `positive_split` 为目标正类比例,
    /// 必须在 `[0, 1]` 内, 否则返回 `None`.
    pub fn new(table: &'a LabelTable, positive_split: f32) -> Option<BalancedSampler<'a>> {
        if (0.0..=1.0).contains(&positive_split) {
            Some(Self {
                table,
                positive_split,
            })
        } else {
            None
        }
    }

    /// 抽取 `n` 个病例.
    ///
    /// 1. 当 `n == 0` 或 `n >= 表长` 时退化为全量确定性遍历:
    ///   按表序每条记录恰好使用一次, 不做随机化, 也不做平衡.
    /// 2. 否则维护剩余记录的索引竞技场 (swap-remove), 每次抽取最多做
    ///   [`SAMPLER_RETRY_BUDGET`] 次均匀挑选: 运行中的正类计数不超过
    ///   `(已抽总数) * positive_split` 时只接受阳性记录, 反之只接受阴性记录.
    ///   预算耗尽时静默接受最后一次挑选, 保证抽取一定终止.
    ///   接受一个病例后, 它的 **全部** 记录都会从竞技场中移除.
    pub fn draw<R: Rng>(&self, rng: &mut R, n: usize) -> BalancedDraw {
        let records = self.table.records();

        if n == 0 || n >= records.len() {
            return self.full_pass();
        }

        let mut arena: Vec<usize> = (0..records.len()).collect();
        let mut study_ids = Vec::with_capacity(n);
        let (mut num_positive, mut num_negative) = (0usize, 0usize);

        while study_ids.len() < n && !arena.is_empty() {
            let want_positive =
                num_positive as f32 <= (num_positive + num_negative) as f32 * self.positive_split;

            let mut pick = arena[rng.gen_range(0..arena.len())];
            let mut attempts = SAMPLER_RETRY_BUDGET;
            while want_positive != records[pick].is_positive() {
                attempts -= 1;
                if attempts == 0 {
                    // 预算耗尽则静默接受最后一次挑选.
                    break;
                }
                pick = arena[rng.gen_range(0..arena.len())];
            }

            let accepted = &records[pick];
            if accepted.is_positive() {
                num_positive += 1;
            } else {
                num_negative += 1;
            }
            study_ids.push(accepted.study_id().to_owned());
            remove_study(&mut arena, records, accepted.study_id());
        }

        log::debug!("balanced draw: {num_positive} positive, {num_negative} negative");
        BalancedDraw {
            study_ids,
            num_positive,
            num_negative,
        }
    }

    /// 全量确定性遍历: 每条记录一个样本, 按表序.
    fn full_pass(&self) -> BalancedDraw {
        let records = self.table.records();
        BalancedDraw {
            study_ids: records.iter().map(|r| r.study_id().to_owned()).collect(),
            num_positive: self.table.num_positive(),
            num_negative: self.table.num_negative(),
        }
    }
}

/// 把 `study_id` 的全部记录索引从竞技场中移除 (O(竞技场长度)).
fn remove_study(arena: &mut Vec<usize>, records: &[LabelRecord], study_id: &str) {
    let mut i = 0;
    while i < arena.len() {
        if records[arena[i]].study_id() == study_id {
            arena.swap_remove(i);
        } else {
            i += 1;
        }
    }
}
