//! Chinese text helpers / 中文文本工具
//!
//! - Traditional/simplified conversion for chapter titles / 章节标题简繁转换
//! - Pinyin-first collation for group names / 分组名称拼音排序

use once_cell::sync::Lazy;
use pinyin::ToPinyin;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Chapter title conversion mode / 简繁转换模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChineseConverter {
    #[default]
    None,
    TraditionalToSimplified,
    SimplifiedToTraditional,
}

impl From<u8> for ChineseConverter {
    fn from(value: u8) -> Self {
        match value {
            1 => ChineseConverter::TraditionalToSimplified,
            2 => ChineseConverter::SimplifiedToTraditional,
            _ => ChineseConverter::None,
        }
    }
}

impl ChineseConverter {
    pub fn convert(&self, text: &str) -> String {
        match self {
            ChineseConverter::None => text.to_string(),
            ChineseConverter::TraditionalToSimplified => to_simplified(text),
            ChineseConverter::SimplifiedToTraditional => to_traditional(text),
        }
    }
}

/// 常用繁简对照 (traditional, simplified)
const T2S_PAIRS: &[(char, char)] = &[
    ('國', '国'), ('學', '学'), ('書', '书'), ('電', '电'), ('話', '话'),
    ('語', '语'), ('說', '说'), ('讀', '读'), ('寫', '写'), ('聽', '听'),
    ('見', '见'), ('視', '视'), ('觀', '观'), ('開', '开'), ('關', '关'),
    ('門', '门'), ('間', '间'), ('問', '问'), ('時', '时'), ('當', '当'),
    ('會', '会'), ('應', '应'), ('對', '对'), ('為', '为'), ('無', '无'),
    ('從', '从'), ('來', '来'), ('後', '后'), ('發', '发'), ('動', '动'),
    ('機', '机'), ('車', '车'), ('號', '号'), ('業', '业'), ('產', '产'),
    ('員', '员'), ('務', '务'), ('經', '经'), ('濟', '济'), ('場', '场'),
    ('廠', '厂'), ('區', '区'), ('縣', '县'), ('鄉', '乡'), ('鎮', '镇'),
    ('東', '东'), ('風', '风'), ('雲', '云'), ('長', '长'), ('廣', '广'),
    ('遠', '远'), ('進', '进'), ('過', '过'), ('還', '还'), ('運', '运'),
    ('報', '报'), ('紙', '纸'), ('記', '记'), ('誌', '志'), ('網', '网'),
    ('頁', '页'), ('圖', '图'), ('畫', '画'), ('聲', '声'), ('樂', '乐'),
    ('藝', '艺'), ('術', '术'), ('體', '体'), ('愛', '爱'), ('實', '实'),
    ('現', '现'), ('夢', '梦'), ('裡', '里'), ('頭', '头'), ('臉', '脸'),
    ('點', '点'), ('線', '线'), ('邊', '边'), ('連', '连'), ('錢', '钱'),
    ('買', '买'), ('賣', '卖'), ('價', '价'), ('質', '质'), ('費', '费'),
    ('級', '级'), ('類', '类'), ('種', '种'), ('樣', '样'), ('數', '数'),
    ('統', '统'), ('計', '计'), ('設', '设'), ('備', '备'), ('處', '处'),
    ('辦', '办'), ('總', '总'), ('結', '结'), ('組', '组'), ('織', '织'),
    ('係', '系'), ('聯', '联'), ('歷', '历'), ('認', '认'), ('識', '识'),
    ('證', '证'), ('據', '据'), ('論', '论'), ('談', '谈'), ('議', '议'),
    ('選', '选'), ('決', '决'), ('權', '权'), ('黨', '党'), ('軍', '军'),
    ('戰', '战'), ('鬥', '斗'), ('勝', '胜'), ('敗', '败'), ('條', '条'),
    ('規', '规'), ('則', '则'), ('標', '标'), ('準', '准'), ('廳', '厅'),
    ('館', '馆'), ('樓', '楼'), ('臺', '台'), ('燈', '灯'), ('裝', '装'),
    ('雜', '杂'), ('難', '难'), ('專', '专'), ('師', '师'), ('醫', '医'),
    ('藥', '药'), ('導', '导'), ('養', '养'), ('習', '习'), ('練', '练'),
    ('節', '节'), ('張', '张'), ('終', '终'),
];

/// Simplified forms that are also valid traditional characters / 一简对多繁，反向转换时保持原样
const AMBIGUOUS_SIMPLIFIED: &[char] = &['后', '志', '里', '系', '斗', '准', '台'];

static T2S: Lazy<HashMap<char, char>> = Lazy::new(|| {
    T2S_PAIRS
        .iter()
        .copied()
        .collect()
});

static S2T: Lazy<HashMap<char, char>> = Lazy::new(|| {
    T2S_PAIRS
        .iter()
        .filter(|(_, s)| !AMBIGUOUS_SIMPLIFIED.contains(s))
        .map(|&(t, s)| (s, t))
        .collect()
});

/// 繁体转简体（常用字映射）
pub fn to_simplified(text: &str) -> String {
    text.chars().map(|c| *T2S.get(&c).unwrap_or(&c)).collect()
}

/// 简体转繁体（常用字映射）
pub fn to_traditional(text: &str) -> String {
    text.chars().map(|c| *S2T.get(&c).unwrap_or(&c)).collect()
}

/// Collation key: Han characters become their toneless pinyin / 排序键：汉字转为拼音
fn collation_key(text: &str) -> String {
    let mut key = String::with_capacity(text.len() * 2);
    for (c, py) in text.chars().zip(text.to_pinyin()) {
        match py {
            Some(py) => {
                key.push_str(py.plain());
                // keeps 李 and "li" apart while sorting them next to each other
                key.push('\u{1}');
            }
            None => key.extend(c.to_lowercase()),
        }
    }
    key
}

/// Chinese-aware comparison (pinyin first, then natural order) / 中文比较
pub fn cn_compare(a: &str, b: &str) -> Ordering {
    natord::compare(&collation_key(a), &collation_key(b)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converter_from_setting() {
        assert_eq!(ChineseConverter::from(0), ChineseConverter::None);
        assert_eq!(ChineseConverter::from(1), ChineseConverter::TraditionalToSimplified);
        assert_eq!(ChineseConverter::from(2), ChineseConverter::SimplifiedToTraditional);
        assert_eq!(ChineseConverter::from(9), ChineseConverter::None);
    }

    #[test]
    fn test_simplified_traditional() {
        assert_eq!(to_simplified("第一章 開門"), "第一章 开门");
        assert_eq!(to_traditional("第一章 开门"), "第一章 開門");
        // 后 stays as-is because it is also a traditional character
        assert_eq!(to_traditional("后来"), "后來");
    }

    #[test]
    fn test_cn_compare_orders_by_pinyin() {
        let mut groups = vec!["张三", "abc", "阿里", "Book", "李四"];
        groups.sort_by(|a, b| cn_compare(a, b));
        assert_eq!(groups, vec!["阿里", "abc", "Book", "李四", "张三"]);
    }

    #[test]
    fn test_cn_compare_natural_numbers() {
        let mut groups = vec!["分组10", "分组2", "分组1"];
        groups.sort_by(|a, b| cn_compare(a, b));
        assert_eq!(groups, vec!["分组1", "分组2", "分组10"]);
    }
}
