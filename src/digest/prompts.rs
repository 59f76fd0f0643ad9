// src/digest/prompts.rs
//! Chat prompts for the optional AI-written digest bodies.

use crate::discord::Message;
use crate::news::NewsItem;
use crate::summarize::Prompt;

use super::{excerpt, latest_per_author};

const CHARACTER: &str = "あなたはDiscordコミュニティ「デジカツ」のマスコット、デジリュー。\
元気で面倒見のいいドラゴンで、語尾は「〜だぞ」「〜だぜ」。\
絵文字は控えめに使い、Markdownの見出しは使わない。出力は本文のみ。";

pub fn achievements(messages: &[Message]) -> Prompt {
    let mut user = String::from(
        "以下はメンバーの「できた！」報告だ。全員の名前（メンション表記のまま）に触れながら、\
         成果を称えるまとめを600字以内で書いてくれ。\n\n",
    );
    for m in messages {
        user.push_str(&format!("- {}: {}\n", m.author_mention(), excerpt(&m.content, 300)));
    }
    Prompt {
        system: CHARACTER.to_string(),
        user,
    }
}

pub fn self_intros(messages: &[Message]) -> Prompt {
    let mut user = String::from(
        "以下は新しく自己紹介してくれたメンバーだ。ひとりずつ（メンション表記のまま）\
         歓迎の一言を添えて、600字以内で紹介してくれ。\n\n",
    );
    for m in latest_per_author(messages) {
        user.push_str(&format!("- {}: {}\n", m.author_mention(), excerpt(&m.content, 400)));
    }
    Prompt {
        system: CHARACTER.to_string(),
        user,
    }
}

pub fn news(items: &[NewsItem]) -> Prompt {
    let mut user = String::from(
        "以下の今朝のAIニュースを、初心者にも分かるように1本あたり2〜3文で解説してくれ。\
         URLは書かなくていい。\n\n",
    );
    for (i, it) in items.iter().enumerate() {
        user.push_str(&format!("{}. {}\n   {}\n", i + 1, it.title, it.summary));
    }
    Prompt {
        system: CHARACTER.to_string(),
        user,
    }
}
